//! TCP framing and per-connection I/O tasks.
//!
//! Each connection is driven by a single task that decodes inbound frames
//! and forwards them to the reactor over [`Inbound`], while draining its own
//! outbound event queue back onto the socket — the same receiver/sender
//! split the teacher's network layer uses, just folded into one task since
//! `TcpStream` read/write halves can be polled concurrently via `select!`.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use wire::{decode_envelope, frame_envelope, Call, Envelope, Event};

use crate::auth::PasswordFile;
use crate::client::RemoteSender;
use crate::error::{AuthenticationFailure, ProtocolError};

/// Maximum accepted frame body size. Generous for the 16/4-real schema in
/// play here; guards against a corrupt length prefix pinning an unbounded
/// allocation.
const MAX_FRAME_LEN: u32 = 1 << 20;

/// Messages the reactor receives from connection tasks.
pub enum Inbound {
    /// A freshly authenticated connection; the reactor registers it and
    /// replies with the assigned client id.
    Connect {
        username: String,
        remote: RemoteSender,
        respond_with_id: oneshot::Sender<String>,
    },
    Call { client_id: String, call: Call },
    Disconnected { client_id: String },
}

async fn read_frame(stream: &mut TcpStream) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = stream.read_exact(&mut len_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(ProtocolError::from(e));
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await?;
    Ok(Some(body))
}

fn decode(body: &[u8]) -> Result<Envelope, ProtocolError> {
    decode_envelope(body).map_err(ProtocolError::from)
}

async fn write_event(stream: &mut TcpStream, event: &Event) -> std::io::Result<()> {
    let framed = frame_envelope(&Envelope::Event(event.clone())).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    stream.write_all(&framed).await
}

/// Reads the single `Authenticate` call every connection must send first and
/// checks it against the password file. Does not yet register with the
/// reactor — the caller owns the outbound channel that registration needs.
async fn read_credentials(stream: &mut TcpStream, passwords: &PasswordFile) -> Option<(String, String)> {
    let body = match read_frame(stream).await {
        Ok(Some(body)) => body,
        Ok(None) => return None,
        Err(e) => {
            warn!("error reading credentials frame: {e}");
            return None;
        }
    };
    let call = match decode(&body) {
        Ok(Envelope::Call(call)) => call,
        Ok(Envelope::Event(_)) => return None,
        Err(e) => {
            warn!("error decoding credentials frame: {e}");
            return None;
        }
    };
    let (username, password) = match call {
        Call::Authenticate { username, password } => (username, password),
        _ => return None,
    };

    if passwords.authenticate(&username, &password) {
        Some((username, password))
    } else {
        warn!("{}", AuthenticationFailure { username });
        None
    }
}

/// Drives one accepted connection: authenticates it, registers with the
/// reactor, then alternates reading client calls and forwarding
/// reactor-queued events until either side closes.
pub async fn handle_connection(mut stream: TcpStream, passwords: Arc<PasswordFile>, inbound_tx: mpsc::UnboundedSender<Inbound>) {
    let username = match read_credentials(&mut stream, &passwords).await {
        Some((username, _password)) => username,
        None => {
            let _ = write_event(&mut stream, &Event::AuthenticationFailed).await;
            return;
        }
    };

    let (remote_tx, mut remote_rx) = mpsc::unbounded_channel::<Event>();
    let (respond_with_id, id_rx) = oneshot::channel();
    if inbound_tx
        .send(Inbound::Connect { username: username.clone(), remote: remote_tx, respond_with_id })
        .is_err()
    {
        return;
    }
    let client_id = match id_rx.await {
        Ok(id) => id,
        Err(_) => return,
    };

    if write_event(&mut stream, &Event::Authenticated).await.is_err() {
        let _ = inbound_tx.send(Inbound::Disconnected { client_id });
        return;
    }
    info!("client {client_id} authenticated as {username}");

    loop {
        tokio::select! {
            frame = read_frame(&mut stream) => {
                match frame {
                    Ok(Some(body)) => match decode(&body) {
                        Ok(Envelope::Call(call)) => {
                            if inbound_tx.send(Inbound::Call { client_id: client_id.clone(), call }).is_err() {
                                break;
                            }
                        }
                        Ok(Envelope::Event(_)) => {
                            warn!("client {client_id} sent a server-bound Event frame, ignoring");
                        }
                        Err(e) => {
                            warn!("client {client_id} sent an undecodable frame: {e}");
                            break;
                        }
                    },
                    Ok(None) => {
                        debug!("client {client_id} closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("client {client_id} read error: {e}");
                        break;
                    }
                }
            }
            event = remote_rx.recv() => {
                match event {
                    Some(event) => {
                        if write_event(&mut stream, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = inbound_tx.send(Inbound::Disconnected { client_id });
}
