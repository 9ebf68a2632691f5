pub mod densemap;
pub mod eval;
pub mod fs;
pub mod graph;
pub mod load;
pub mod parse;
pub mod progress;
pub mod resolve;
pub mod rules;
pub mod run;
pub mod scanner;
pub mod task;
mod terminal;
pub mod trace;
pub mod work;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
