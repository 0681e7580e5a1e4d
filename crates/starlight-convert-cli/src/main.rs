use std::process;

fn main() {
    match starlight_convert_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("convert-to-starlight error: {err}");
            process::exit(1);
        }
    }
}
