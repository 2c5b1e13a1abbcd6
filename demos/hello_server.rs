use reactor_web::{limits::ServerLimits, HttpServer, Request, Response};
use std::{env, io::Write, path::PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let port = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(8080);

    let mut server = HttpServer::builder()
        .port(port)
        .limits(ServerLimits {
            log_file: Some(PathBuf::from("server.log")),
            ..ServerLimits::default()
        })
        .build()
        .expect("failed to create server");

    server
        .get("/", |_: &Request| Response::html_response("<h1>Hello, world!</h1>"))
        .unwrap();
    server
        .get("/test", |_: &Request| Response::ok("ok"))
        .unwrap();
    server
        .get("/api/status", |_: &Request| {
            Response::json_response(r#"{"status": "running"}"#)
        })
        .unwrap();
    server
        .post("/echo", |req: &Request| {
            Response::default().set_body(req.body.clone(), req.get_header("content-type"))
        })
        .unwrap();
    server
        .get("/stream", |_: &Request| {
            let lines = ["first\n", "second\n", "third\n"];
            let length = lines.iter().map(|line| line.len()).sum();
            Response::default().set_streaming(
                move |out: &mut dyn Write| {
                    for line in lines {
                        out.write_all(line.as_bytes())?;
                    }
                    Ok(())
                },
                length,
                "text/plain",
            )
        })
        .unwrap();

    server.start().expect("failed to start server");
    println!("Listening on port {port}. Type 'quit' to stop.");

    let control = server.control();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines().map_while(Result::ok) {
            if control.send(line).is_err() {
                break;
            }
        }
    });

    server.wait();
    println!("Server stopped");
}
