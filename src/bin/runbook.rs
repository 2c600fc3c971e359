fn main() {
    runbook::cli::run();
}
