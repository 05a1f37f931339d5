fn main() {
    if let Err(err) = blockdiagram_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
