//! Basic usage example for mboxd
//!
//! Starts a server on a temporary mail directory, submits a message to two
//! local users and prints their mailboxes.

use mboxd::SmtpServer;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    mboxd::logging::init(true)?;

    let mail_dir = tempfile::tempdir()?;
    for user in ["alice", "bob"] {
        fs::write(mail_dir.path().join(format!("{user}.mbox")), b"")?;
    }
    println!("Mail directory: {}", mail_dir.path().display());

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let server = SmtpServer::new("localhost", mail_dir.path());
    thread::spawn(move || server.start_with_listener(listener));

    send_test_email(&addr.to_string())?;

    for user in ["alice", "bob"] {
        println!("\n== {user}.mbox ==");
        print!("{}", fs::read_to_string(mail_dir.path().join(format!("{user}.mbox")))?);
    }

    Ok(())
}

fn send_test_email(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut response = String::new();

    // Read greeting
    reader.read_line(&mut response)?;
    print!("S: {response}");

    for command in [
        "HELO client.example.com",
        "MAIL FROM:<sender@example.com>",
        "RCPT TO:<alice@localhost>",
        "RCPT TO:<bob@localhost>",
        "DATA",
        "Subject: Test Email from mboxd\r\n\r\nHello from the basic usage example.\r\n.",
        "QUIT",
    ] {
        write!(stream, "{command}\r\n")?;
        response.clear();
        reader.read_line(&mut response)?;
        print!("S: {response}");
    }

    Ok(())
}
