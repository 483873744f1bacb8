//! Mirror daemon core: receives TUIO bundles and fans them out to a set of
//! OSC sinks, controlled at runtime over a UNIX-domain socket with a small
//! shell-style command language.
//!
//! The control socket lives at `$TMPDIR/muse-mirror_<port>.ctl` and is
//! removed on exit. Replies are textual: `OK` (plus payload lines) or
//! `ERROR: <reason>`.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket, UnixListener};
use tracing::{info, warn};

use crate::adaptors::Adaptor;
use crate::error::Error;

/// Runtime configuration of the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// UDP port the TUIO client listens on; also names the control socket.
    pub port: u16,
    /// Forward unknown OSC paths instead of dropping them.
    pub accept_unknown: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig { port: 3333, accept_unknown: true }
    }
}

impl MirrorConfig {
    /// Load the daemon configuration from a JSON file; an unreadable or
    /// invalid file refuses start-up.
    pub fn load(path: &std::path::Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| Error::Config(err.to_string()))
    }
}

/// Where the control socket for a given data port lives.
pub fn control_socket_path(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("muse-mirror_{port}.ctl"))
}

/// Builds the mid-chain processor on a `config` command. The configuration
/// payload format (file path or inline XML) is owned by the embedder.
pub trait ChainBuilder: Send + Sync {
    fn build(&self, config: &str) -> Result<Vec<Box<dyn Adaptor>>, Error>;
}

/// Commands accepted on the control socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(Vec<String>),
    Del(Vec<String>),
    Show,
    Config(String),
    Stop,
}

/// Split a command line shell-style: whitespace separates words, `"` quotes
/// them, `\` escapes the next character.
pub fn tokenize(line: &str) -> Result<Vec<String>, Error> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| Error::Config("dangling escape".into()))?;
                current.push(escaped);
                in_word = true;
            }
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(Error::Config("unterminated quote".into()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parse one control line into a command.
pub fn parse_command(line: &str) -> Result<Option<Command>, Error> {
    let words = tokenize(line)?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };
    match head.as_str() {
        "add" => {
            if rest.is_empty() {
                return Err(Error::Config("add requires at least one uri".into()));
            }
            Ok(Some(Command::Add(rest.to_vec())))
        }
        "del" => {
            if rest.is_empty() {
                return Err(Error::Config("del requires at least one uri".into()));
            }
            Ok(Some(Command::Del(rest.to_vec())))
        }
        "show" => Ok(Some(Command::Show)),
        "config" => {
            if rest.len() != 1 {
                return Err(Error::Config("config requires exactly one argument".into()));
            }
            Ok(Some(Command::Config(rest[0].clone())))
        }
        "stop" | "quit" => Ok(Some(Command::Stop)),
        other => Err(Error::Config(format!("unknown command {other}"))),
    }
}

/// A parsed sink URI: `osc.udp://host:port` or `osc.tcp://host:port`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SinkUri {
    pub tcp: bool,
    pub target: SocketAddr,
}

impl SinkUri {
    pub fn parse(uri: &str) -> Result<SinkUri, Error> {
        let (tcp, rest) = if let Some(rest) = uri.strip_prefix("osc.udp://") {
            (false, rest)
        } else if let Some(rest) = uri.strip_prefix("osc.tcp://") {
            (true, rest)
        } else {
            return Err(Error::Config(format!("unsupported sink uri {uri}")));
        };
        let rest = rest.trim_end_matches('/');
        let target: SocketAddr = rest
            .parse()
            .map_err(|_| Error::Config(format!("invalid sink address {rest}")))?;
        Ok(SinkUri { tcp, target })
    }
}

impl std::fmt::Display for SinkUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.tcp { "osc.tcp" } else { "osc.udp" };
        write!(f, "{}://{}", scheme, self.target)
    }
}

/// One attached outbound sink.
enum Sink {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Sink {
    async fn open(uri: &SinkUri) -> Result<Sink, Error> {
        if uri.tcp {
            Ok(Sink::Tcp(TcpStream::connect(uri.target).await?))
        } else {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(uri.target).await?;
            Ok(Sink::Udp(socket))
        }
    }

    async fn forward(&mut self, data: &[u8]) -> Result<(), Error> {
        match self {
            Sink::Udp(socket) => {
                socket.send(data).await?;
            }
            Sink::Tcp(stream) => {
                stream.write_all(&(data.len() as i32).to_be_bytes()).await?;
                stream.write_all(data).await?;
            }
        }
        Ok(())
    }
}

/// The shared sink table; the data path iterates it, the control path
/// mutates it.
#[derive(Default)]
pub struct SinkTable {
    sinks: Mutex<BTreeMap<SinkUri, Sink>>,
}

impl SinkTable {
    pub fn new() -> Arc<Self> {
        Arc::new(SinkTable::default())
    }

    pub async fn add(&self, uri: SinkUri) -> Result<(), Error> {
        let sink = Sink::open(&uri).await?;
        self.sinks.lock().insert(uri, sink);
        Ok(())
    }

    pub fn del(&self, uri: &SinkUri) -> bool {
        self.sinks.lock().remove(uri).is_some()
    }

    pub fn list(&self) -> Vec<String> {
        self.sinks.lock().keys().map(|uri| uri.to_string()).collect()
    }

    /// Forward one encoded bundle to every sink; failing sinks are dropped
    /// with a log line, the data path never aborts.
    ///
    /// The table is taken out of the lock for the duration of the sends so
    /// no lock is held across an await point.
    pub async fn forward_all(&self, data: &[u8]) {
        let taken = std::mem::take(&mut *self.sinks.lock());
        let mut kept = BTreeMap::new();
        for (uri, mut sink) in taken {
            match sink.forward(data).await {
                Ok(()) => {
                    kept.insert(uri, sink);
                }
                Err(err) => warn!("sink {uri} dropped: {err}"),
            }
        }
        let mut current = self.sinks.lock();
        for (uri, sink) in kept {
            current.entry(uri).or_insert(sink);
        }
    }
}

/// Apply one command against the daemon state and produce the reply text.
pub async fn execute_command(
    command: Command,
    sinks: &SinkTable,
    chain_builder: Option<&dyn ChainBuilder>,
) -> (String, bool) {
    match command {
        Command::Add(uris) => {
            for uri in uris {
                let parsed = match SinkUri::parse(&uri) {
                    Ok(parsed) => parsed,
                    Err(err) => return (format!("ERROR: {err}"), false),
                };
                if let Err(err) = sinks.add(parsed).await {
                    return (format!("ERROR: {err}"), false);
                }
            }
            ("OK".to_string(), false)
        }
        Command::Del(uris) => {
            for uri in uris {
                let parsed = match SinkUri::parse(&uri) {
                    Ok(parsed) => parsed,
                    Err(err) => return (format!("ERROR: {err}"), false),
                };
                if !sinks.del(&parsed) {
                    return (format!("ERROR: no such sink {parsed}"), false);
                }
            }
            ("OK".to_string(), false)
        }
        Command::Show => {
            let mut reply = String::from("OK");
            for line in sinks.list() {
                reply.push('\n');
                reply.push_str(&line);
            }
            (reply, false)
        }
        Command::Config(payload) => match chain_builder {
            Some(builder) => match builder.build(&payload) {
                Ok(_) => ("OK".to_string(), false),
                Err(err) => (format!("ERROR: {err}"), false),
            },
            None => ("ERROR: no chain builder configured".to_string(), false),
        },
        Command::Stop => ("OK".to_string(), true),
    }
}

/// Serve the control socket until a `stop`/`quit` arrives; the socket file
/// is removed on return.
pub async fn serve_control_socket(
    config: &MirrorConfig,
    sinks: Arc<SinkTable>,
    chain_builder: Option<Arc<dyn ChainBuilder>>,
) -> Result<(), Error> {
    let path = control_socket_path(config.port);
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    info!("control socket at {}", path.display());

    let mut stop = false;
    while !stop {
        let (stream, _) = listener.accept().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let reply = match parse_command(&line) {
                Ok(None) => continue,
                Ok(Some(command)) => {
                    let (reply, should_stop) =
                        execute_command(command, &sinks, chain_builder.as_deref()).await;
                    stop |= should_stop;
                    reply
                }
                Err(err) => format!("ERROR: {err}"),
            };
            if write_half.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
            let _ = write_half.write_all(b"\n").await;
            if stop {
                break;
            }
        }
    }

    let _ = std::fs::remove_file(&path);
    Ok(())
}
