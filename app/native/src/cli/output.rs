//! CLI output formatting utilities.
//!
//! Response payloads from the daemon print as syntax-highlighted JSON. Plain
//! acknowledgements print as a short message instead of `null` noise.

use colored::Colorize;

/// Prints a response payload.
///
/// `null` means the command succeeded with nothing to report. Bare strings
/// print without quotes; everything else prints as highlighted JSON.
pub fn print_data(data: &serde_json::Value) {
    match data {
        serde_json::Value::Null => println!("{}", "OK".green()),
        serde_json::Value::String(text) => println!("{text}"),
        other => print_json(other, 0),
    }
}

/// Recursively prints a JSON value with indentation and color.
///
/// Colors: keys cyan, strings green, numbers yellow, booleans and null
/// magenta.
fn print_json(value: &serde_json::Value, indent: usize) {
    print_json_inner(value, indent);
    println!();
}

fn print_json_inner(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    let inner_pad = "  ".repeat(indent + 1);

    match value {
        serde_json::Value::Object(map) => {
            if map.is_empty() {
                print!("{{}}");
                return;
            }
            println!("{{");
            for (i, (key, val)) in map.iter().enumerate() {
                print!("{inner_pad}{}: ", format!("\"{key}\"").cyan());
                print_json_inner(val, indent + 1);
                if i + 1 < map.len() {
                    print!(",");
                }
                println!();
            }
            print!("{pad}}}");
        }
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                print!("[]");
                return;
            }
            println!("[");
            for (i, item) in items.iter().enumerate() {
                print!("{inner_pad}");
                print_json_inner(item, indent + 1);
                if i + 1 < items.len() {
                    print!(",");
                }
                println!();
            }
            print!("{pad}]");
        }
        serde_json::Value::String(text) => {
            print!("{}", format!("\"{text}\"").green());
        }
        serde_json::Value::Number(number) => print!("{}", number.to_string().yellow()),
        serde_json::Value::Bool(flag) => print!("{}", flag.to_string().magenta()),
        serde_json::Value::Null => print!("{}", "null".magenta()),
    }
}
