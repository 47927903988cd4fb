use std::process;

fn main() {
    match markdown_codewrap_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("markdown-codewrap error: {err:#}");
            process::exit(1);
        }
    }
}
