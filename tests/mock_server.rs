//! Mock Event Socket server for integration testing

use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub struct MockEslServer {
    listener: TcpListener,
    password: String,
}

pub struct MockSession {
    stream: TcpStream,
}

impl MockEslServer {
    pub async fn start(password: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self {
            listener,
            password: password.to_string(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.listener.local_addr().unwrap()
    }

    pub fn port(&self) -> u16 {
        self.addr().port()
    }

    /// Accept a connection and perform the auth handshake.
    pub async fn accept(&self) -> MockSession {
        let (stream, _addr) = self.listener.accept().await.unwrap();
        let mut session = MockSession { stream };

        session.send_raw("Content-Type: auth/request\n\n").await;

        let cmd = session.read_command().await;
        let expected = format!("auth {}\n\n", self.password);
        if cmd == expected {
            session.reply_ok().await;
        } else {
            session.reply_err("invalid").await;
        }

        session
    }
}

impl MockSession {
    pub async fn send_raw(&mut self, data: &str) {
        self.stream.write_all(data.as_bytes()).await.unwrap();
    }

    /// Send a text/event-plain event with the two-part wire format.
    pub async fn send_event_plain(&mut self, event_name: &str, headers: &[(&str, &str)]) {
        let mut body = format!(
            "Event-Name: {}\n",
            percent_encode(event_name.as_bytes(), NON_ALPHANUMERIC)
        );
        for (name, value) in headers {
            body.push_str(&format!(
                "{}: {}\n",
                name,
                percent_encode(value.as_bytes(), NON_ALPHANUMERIC)
            ));
        }
        body.push('\n');

        let envelope = format!(
            "Content-Length: {}\nContent-Type: text/event-plain\n\n",
            body.len()
        );
        self.send_raw(&format!("{}{}", envelope, body)).await;
    }

    /// Send a BACKGROUND_JOB event carrying the job result in its payload.
    pub async fn send_background_job(&mut self, job_id: &str, result: &str) {
        let mut body = String::from("Event-Name: BACKGROUND%5FJOB\n");
        body.push_str(&format!("Job-UUID: {}\n", job_id));
        body.push_str(&format!("Content-Length: {}\n\n{}", result.len(), result));

        let envelope = format!(
            "Content-Length: {}\nContent-Type: text/event-plain\n\n",
            body.len()
        );
        self.send_raw(&format!("{}{}", envelope, body)).await;
    }

    /// Send a disconnect notice.
    pub async fn send_disconnect_notice(&mut self, message: &str) {
        let data = format!(
            "Content-Type: text/disconnect-notice\nContent-Disposition: disconnect\nContent-Length: {}\n\n{}",
            message.len(),
            message
        );
        self.send_raw(&data).await;
    }

    /// Read one command from the client (everything up to `\n\n`).
    pub async fn read_command(&mut self) -> String {
        let mut reader = BufReader::new(&mut self.stream);
        let mut result = String::new();

        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await.unwrap();
            if n == 0 {
                break;
            }
            result.push_str(&line);
            if result.ends_with("\n\n") {
                break;
            }
        }

        result
    }

    /// Send a `+OK` command reply.
    pub async fn reply_ok(&mut self) {
        self.send_raw("Content-Type: command/reply\nReply-Text: +OK accepted\n\n")
            .await;
    }

    /// Send a `+OK` command reply carrying a Job-UUID header, as the
    /// server does when acknowledging `bgapi`.
    pub async fn reply_ok_with_job(&mut self, job_id: &str) {
        let data = format!(
            "Content-Type: command/reply\nReply-Text: +OK Job-UUID: {}\nJob-UUID: {}\n\n",
            job_id, job_id
        );
        self.send_raw(&data).await;
    }

    /// Send an api/response with a body.
    pub async fn reply_api(&mut self, body: &str) {
        let data = format!(
            "Content-Type: api/response\nContent-Length: {}\n\n{}",
            body.len(),
            body
        );
        self.send_raw(&data).await;
    }

    /// Send a `-ERR` command reply.
    pub async fn reply_err(&mut self, text: &str) {
        let data = format!("Content-Type: command/reply\nReply-Text: -ERR {}\n\n", text);
        self.send_raw(&data).await;
    }

    /// Drop the TCP connection.
    pub fn drop_connection(self) {
        drop(self.stream);
    }
}

/// Create a connected (MockSession, EslClient) pair.
pub async fn setup_connected_pair(password: &str) -> (MockSession, event_socket::EslClient) {
    let server = MockEslServer::start(password).await;
    let port = server.port();

    let (session, client) = tokio::join!(
        server.accept(),
        event_socket::EslClient::connect("127.0.0.1", port, password)
    );

    (session, client.unwrap())
}
