fn main() {
    curlkit::cli::run();
}
