use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use habterm::config::RemoteConfig;
use habterm::entity::Command;
use habterm::flatten::flatten;
use habterm::{ConsoleError, RestClient, SitemapSource};

#[derive(Debug)]
struct Recorded {
    method: String,
    path: String,
    content_type: Option<String>,
    body: String,
}

struct FakeHab {
    port: u16,
    requests: Receiver<Recorded>,
    handle: JoinHandle<()>,
}

impl FakeHab {
    /// Answers one request per entry of `responses`, in order.
    fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let port = listener.local_addr().expect("fake server addr").port();
        let (tx, requests) = mpsc::channel();
        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let (stream, _) = listener.accept().expect("accept request");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                reader.read_line(&mut request_line).expect("read request line");
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                let mut content_length = 0;
                let mut content_type = None;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("read header");
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        let value = value.trim();
                        match name.to_ascii_lowercase().as_str() {
                            "content-length" => {
                                content_length = value.parse().expect("content length");
                            }
                            "content-type" => content_type = Some(value.to_string()),
                            _ => {}
                        }
                    }
                }
                let mut request_body = vec![0_u8; content_length];
                reader.read_exact(&mut request_body).expect("read body");
                tx.send(Recorded {
                    method,
                    path,
                    content_type,
                    body: String::from_utf8_lossy(&request_body).into_owned(),
                })
                .expect("record request");

                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .expect("write response");
            }
        });
        Self {
            port,
            requests,
            handle,
        }
    }

    fn remote(&self, sitemap: &str) -> RemoteConfig {
        RemoteConfig {
            host: "127.0.0.1".into(),
            port: self.port,
            sitemap: sitemap.into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn next_request(&self) -> Recorded {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("request recorded")
    }

    fn finish(self) {
        self.handle.join().expect("fake server thread");
    }
}

const SITEMAP_JSON: &str = r#"{
  "name": "home",
  "label": "Home",
  "link": "http://hab.test/rest/sitemaps/home",
  "homepage": {
    "id": "home",
    "title": "Home",
    "widgets": [
      {
        "widgetId": "00",
        "type": "Frame",
        "visibility": true,
        "label": "Lights",
        "icon": "light",
        "mappings": [],
        "widgets": [
          {
            "widgetId": "0000",
            "type": "Switch",
            "visibility": true,
            "label": "Lamp",
            "state": "ON",
            "mappings": [],
            "item": {
              "type": "Switch",
              "name": "Lamp",
              "link": "http://hab.test/rest/items/Lamp",
              "state": "OFF"
            },
            "widgets": []
          },
          {
            "widgetId": "0001",
            "type": "Slider",
            "label": "Dimmer",
            "item": {
              "name": "Dimmer",
              "link": "http://hab.test/rest/items/Dimmer",
              "state": "65"
            }
          },
          {
            "widgetId": "0002",
            "type": "Switch",
            "visibility": false,
            "label": "Hidden",
            "item": { "name": "Hidden", "link": "", "state": "ON" }
          },
          {
            "widgetId": "0003",
            "type": "Text",
            "label": "Outside [12 C]"
          }
        ]
      }
    ]
  }
}"#;

#[test]
fn fetch_reads_the_configured_sitemap() {
    let server = FakeHab::start(vec![(200, SITEMAP_JSON.to_string())]);
    let client = RestClient::new(&server.remote("home"));
    assert_eq!(
        client.sitemap_url(),
        format!("http://127.0.0.1:{}/rest/sitemaps/home", server.port)
    );

    let widgets = client.fetch().expect("fetch sitemap");
    let request = server.next_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/rest/sitemaps/home");
    server.finish();

    let rows = flatten(&widgets, 0, "");
    let texts = rows.iter().map(|row| row.text()).collect::<Vec<_>>();
    assert_eq!(
        texts,
        vec![
            "Lights",
            "  Lamp       [X]",
            "  Dimmer     [|||||||||||||       ]",
        ]
    );
}

#[test]
fn send_command_posts_plain_text_to_the_item() {
    let server = FakeHab::start(vec![(200, String::new())]);
    let client = RestClient::new(&server.remote("home"));
    let command = Command {
        target: format!("http://127.0.0.1:{}/rest/items/Lamp", server.port).into(),
        value: "ON".into(),
    };

    client.send_command(&command).expect("send command");
    let request = server.next_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/rest/items/Lamp");
    assert_eq!(request.content_type.as_deref(), Some("text/plain"));
    assert_eq!(request.body, "ON");
    server.finish();
}

#[test]
fn empty_body_means_unknown_sitemap() {
    let server = FakeHab::start(vec![(200, String::new())]);
    let client = RestClient::new(&server.remote("attic"));
    let err = client.fetch().expect_err("empty body is an error");
    server.finish();

    assert!(matches!(err, ConsoleError::InvalidSitemap(_)));
    assert_eq!(
        err.to_string(),
        "invalid sitemap: no sitemap found with the name attic"
    );
}

#[test]
fn error_status_and_bad_payload_are_reported() {
    let server = FakeHab::start(vec![
        (404, r#"{"error":{"message":"Sitemap not found"}}"#.to_string()),
        (200, r#"{"name":"home"}"#.to_string()),
        (500, String::new()),
    ]);
    let client = RestClient::new(&server.remote("home"));

    let err = client.fetch().expect_err("404 is an error");
    assert!(matches!(err, ConsoleError::Transport(_)));
    assert!(err.to_string().contains("server answered 404"), "{err}");

    let err = client.fetch().expect_err("missing homepage is an error");
    assert!(matches!(err, ConsoleError::InvalidSitemap(_)), "{err}");

    let command = Command {
        target: format!("http://127.0.0.1:{}/rest/items/Lamp", server.port).into(),
        value: "OFF".into(),
    };
    let err = client
        .send_command(&command)
        .expect_err("500 is an error");
    assert!(err.to_string().contains("server answered 500"), "{err}");
    server.finish();
}

#[test]
fn command_without_item_link_is_not_sent() {
    let client = RestClient::new(&RemoteConfig::default());
    let command = Command {
        target: "".into(),
        value: "ON".into(),
    };
    let err = client.send_command(&command).expect_err("no target");
    assert!(matches!(err, ConsoleError::Transport(_)));
}
