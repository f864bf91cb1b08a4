//! Mock SMTP relay for exercising the SMTP transport
//!
//! Speaks just enough plain-text SMTP for a client to deliver a message:
//! greeting, EHLO/HELO, MAIL, RCPT, DATA, RSET, NOOP and QUIT. Recipients can
//! be rejected individually and every accepted message is recorded.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// A message the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub mail_from: String,
    pub rcpt_to: Vec<String>,
    pub content: String,
}

#[derive(Clone, Default)]
struct MockServerConfig {
    /// Recipient address → (code, text) returned for its RCPT command
    rcpt_overrides: HashMap<String, (u16, String)>,
    /// 1-based connection numbers closed before the greeting
    dropped_connections: HashSet<usize>,
}

/// Mock SMTP server for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    received: Arc<RwLock<Vec<ReceivedMessage>>>,
    shutdown: Arc<AtomicBool>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every message accepted so far
    pub async fn received(&self) -> Vec<ReceivedMessage> {
        self.received.read().await.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        received: Arc<RwLock<Vec<ReceivedMessage>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        let mut mail_from = String::new();
        let mut rcpt_to = Vec::new();

        writer.write_all(b"220 Mock SMTP Server\r\n").await?;
        writer.flush().await?;

        loop {
            line.clear();
            let Ok(read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };
            if read? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim_end().to_string();
            let (command, argument) = cmd_line
                .split_once(' ')
                .map_or((cmd_line.as_str(), ""), |(c, a)| (c, a));

            let response = match command.to_uppercase().as_str() {
                "EHLO" => "250-localhost\r\n250 SIZE 10000\r\n".to_string(),
                "HELO" | "NOOP" => "250 OK\r\n".to_string(),
                "RSET" => {
                    mail_from.clear();
                    rcpt_to.clear();
                    "250 OK\r\n".to_string()
                }
                "MAIL" => {
                    mail_from = extract_path(argument);
                    rcpt_to.clear();
                    "250 OK\r\n".to_string()
                }
                "RCPT" => {
                    let to = extract_path(argument);
                    if let Some((code, text)) = config.rcpt_overrides.get(&to) {
                        format!("{code} {text}\r\n")
                    } else {
                        rcpt_to.push(to);
                        "250 OK\r\n".to_string()
                    }
                }
                "DATA" => {
                    writer
                        .write_all(b"354 Start mail input; end with <CRLF>.<CRLF>\r\n")
                        .await?;
                    writer.flush().await?;

                    let mut content = String::new();
                    let mut data_line = String::new();
                    loop {
                        data_line.clear();
                        if reader.read_line(&mut data_line).await? == 0 {
                            return Ok(());
                        }
                        if data_line.trim_end() == "." {
                            break;
                        }
                        content.push_str(&data_line);
                    }

                    received.write().await.push(ReceivedMessage {
                        mail_from: std::mem::take(&mut mail_from),
                        rcpt_to: std::mem::take(&mut rcpt_to),
                        content,
                    });
                    "250 OK: Message accepted\r\n".to_string()
                }
                "QUIT" => {
                    writer.write_all(b"221 Bye\r\n").await?;
                    writer.flush().await?;
                    return Ok(());
                }
                _ => "500 Unknown command\r\n".to_string(),
            };

            writer.write_all(response.as_bytes()).await?;
            writer.flush().await?;
        }
    }
}

/// `FROM:<a@b>` / `TO:<a@b> SIZE=1` → `a@b`
fn extract_path(argument: &str) -> String {
    argument
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map_or_else(String::new, |(path, _)| path.to_string())
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    /// Answer the RCPT command for `address` with `code`
    #[must_use]
    pub fn with_rcpt_response(
        mut self,
        address: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rcpt_overrides
            .insert(address.into(), (code, message.into()));
        self
    }

    /// Close the `nth` connection (counting from 1) before sending a greeting
    #[must_use]
    pub fn with_dropped_connection(mut self, nth: usize) -> Self {
        self.config.dropped_connections.insert(nth);
        self
    }

    /// Build and start the mock SMTP server on a random local port
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let received = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let received_clone = Arc::clone(&received);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            let mut connections = 0_usize;
            while !shutdown_clone.load(Ordering::Relaxed) {
                // Accept connection with timeout to allow checking shutdown flag
                let Ok(accepted) = timeout(Duration::from_millis(100), listener.accept()).await
                else {
                    continue;
                };
                let Ok((stream, _)) = accepted else {
                    break;
                };

                connections += 1;
                if config.dropped_connections.contains(&connections) {
                    drop(stream);
                    continue;
                }

                let config = Arc::clone(&config);
                let received = Arc::clone(&received_clone);
                tokio::spawn(async move {
                    if let Err(e) = MockSmtpServer::handle_client(stream, config, received).await {
                        tracing::debug!("Mock server client error: {e}");
                    }
                });
            }
        });

        Ok(MockSmtpServer {
            addr,
            received,
            shutdown,
        })
    }
}
