fn main() {
    specforge::cli::run();
}
