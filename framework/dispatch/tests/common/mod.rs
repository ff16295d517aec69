use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// A request captured by [spawn_logger].
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

/// Start a stand-in data logger on a free local port that answers every request with `status`.
///
/// Returns the `host:port` to point a transport at and a receiver of the requests it saw.
pub async fn spawn_logger(status: u16) -> (String, UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (sender, receiver) = unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            if let Some(request) = read_request(&mut socket).await {
                sender.send(request).ok();
            }
            let response =
                format!("HTTP/1.1 {status} Test\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.ok();
            socket.shutdown().await.ok();
        }
    });

    (address, receiver)
}

/// An address nothing is listening on.
pub fn unreachable_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        if buf.len() >= end + 4 + content_length {
            let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + content_length]).to_string();
            return Some(CapturedRequest { head, body });
        }
    }
}
