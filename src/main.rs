use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use loxwalk::Loxwalk;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => run_prompt(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: loxwalk [script]");
            process::exit(64);
        }
    }
}

fn run_file(path: &str) {
    let mut loxwalk = Loxwalk::new(Box::new(io::stdout()));
    loxwalk.run_file(path);
}

fn history_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".loxwalk_history"))
}

fn run_prompt() {
    let mut loxwalk = Loxwalk::new(Box::new(io::stdout()));
    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    let history = history_path();

    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                loxwalk.run_line(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error reading input: {err}");
                break;
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
}
