fn main() {
    let exit_code = mk::run::run();
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
