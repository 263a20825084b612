#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use gmi_client::{GmiClient, NewActivity};
use gmi_contracts::activity::ActivityAction;
use gmi_contracts::{RecordId, UnixMillis};
use serde_json::Value;

const USAGE: &str = "usage: gmi <health|comparisons|activity|companies|plans|templates|users|login|register|log|extract> ...";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).ok_or(USAGE)?;
    let client = GmiClient::from_env();

    match command {
        "health" => print_value(client.health().map_err(stringify)?),
        "comparisons" => match args.get(1).map(String::as_str) {
            Some("ls") | None => print_rows(client.get_comparisons().map_err(stringify)?)?,
            Some("rm") => {
                let id = arg(&args, 2, "usage: gmi comparisons rm <id>")?;
                let removed = client
                    .delete_comparison(&RecordId::from(id))
                    .map_err(stringify)?;
                println!("removed {removed}");
            }
            Some(other) => return Err(format!("unknown comparisons subcommand: {other}")),
        },
        "activity" => print_rows(client.get_activity_logs().map_err(stringify)?)?,
        "companies" => print_rows(client.get_custom_companies().map_err(stringify)?)?,
        "plans" => print_rows(client.get_tob_plans().map_err(stringify)?)?,
        "templates" => match args.get(1).map(String::as_str) {
            Some("ls") | None => print_rows(client.get_tob_templates().map_err(stringify)?)?,
            Some("rm") => {
                let id = arg(&args, 2, "usage: gmi templates rm <id>")?;
                client
                    .delete_tob_template(&RecordId::from(id))
                    .map_err(stringify)?;
                println!("deleted");
            }
            Some(other) => return Err(format!("unknown templates subcommand: {other}")),
        },
        "users" => {
            let users = client.list_users().map_err(stringify)?;
            print_value(serde_json::to_value(users).map_err(stringify)?);
        }
        "login" => {
            let username = arg(&args, 1, "usage: gmi login <username> <password>")?;
            let password = arg(&args, 2, "usage: gmi login <username> <password>")?;
            let user = client.login(username, password).map_err(stringify)?;
            print_value(serde_json::to_value(user).map_err(stringify)?);
        }
        "register" => {
            let username = arg(&args, 1, "usage: gmi register <username> <password> [role]")?;
            let password = arg(&args, 2, "usage: gmi register <username> <password> [role]")?;
            let role = args.get(3).map(String::as_str);
            let user = client
                .register(username, password, role)
                .map_err(stringify)?;
            print_value(serde_json::to_value(user).map_err(stringify)?);
        }
        "log" => {
            let username = arg(&args, 1, "usage: gmi log <username> <action> [details]")?;
            let action = arg(&args, 2, "usage: gmi log <username> <action> [details]")?;
            let entry = NewActivity {
                user_id: None,
                user_email: String::new(),
                user_name: username.to_string(),
                action: ActivityAction::new(action),
                details: args.get(3).cloned().unwrap_or_default(),
            };
            let record = client.log_activity(entry, now_millis()).map_err(stringify)?;
            print_value(serde_json::to_value(record).map_err(stringify)?);
        }
        "extract" => {
            let path = arg(&args, 1, "usage: gmi extract <path> [media-type]")?;
            let bytes = fs::read(path).map_err(|err| format!("cannot read {path}: {err}"))?;
            let media_type = args
                .get(2)
                .cloned()
                .unwrap_or_else(|| guess_media_type(path).to_string());
            let file_name = Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string());
            let extracted = client
                .extract_tob(&bytes, &media_type, &file_name)
                .map_err(stringify)?;
            print_value(extracted);
        }
        _ => return Err(USAGE.to_string()),
    }
    Ok(())
}

fn arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str, String> {
    args.get(index).map(String::as_str).ok_or_else(|| usage.to_string())
}

fn stringify(err: impl std::fmt::Display) -> String {
    err.to_string()
}

fn print_rows(rows: Vec<Value>) -> Result<(), String> {
    print_value(Value::Array(rows));
    Ok(())
}

fn print_value(value: Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(rendered) => println!("{rendered}"),
        Err(_) => println!("{value}"),
    }
}

fn now_millis() -> UnixMillis {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    UnixMillis(elapsed.as_millis() as u64)
}

fn guess_media_type(path: &str) -> &'static str {
    let lowered = path.to_ascii_lowercase();
    if lowered.ends_with(".pdf") {
        "application/pdf"
    } else if lowered.ends_with(".png") {
        "image/png"
    } else if lowered.ends_with(".jpg") || lowered.ends_with(".jpeg") {
        "image/jpeg"
    } else if lowered.ends_with(".webp") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}
