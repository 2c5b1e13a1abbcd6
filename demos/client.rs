use reactor_web::{HttpClient, Request};
use std::env;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/test".to_string());
    let port = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(8080);

    let mut client = HttpClient::new("localhost", port).expect("failed to resolve localhost");
    if let Err(err) = client.connect() {
        eprintln!("Failed to connect to port {port}: {err}");
        return;
    }

    match client.send_request(&Request::create_get(&path, [("from", "demo client")])) {
        Ok(response) => {
            println!("{} {} {}", response.version, response.status_code, response.reason_phrase);
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", response.body_text());
        }
        Err(err) => eprintln!("Request failed: {err}"),
    }
}
