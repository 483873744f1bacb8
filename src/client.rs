//! Receiving side of the pipeline: a UDP client decoding OSC bundles,
//! assembling handles, and driving the adaptor chain plus listener fan-out.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::warn;

use crate::adaptors::Adaptor;
use crate::bundle::{BundleHandle, BundleStack};
use crate::codec::{BundleAssembler, Codec};
use crate::error::Error;
use crate::messages::TreeCompat;

/// Terminal consumer of processed bundles. Callbacks run inline on the
/// loading task, in registration order.
pub trait Listener: Send {
    fn on_bundle(&mut self, bundle: &BundleHandle);
}

impl<F: FnMut(&BundleHandle) + Send> Listener for F {
    fn on_bundle(&mut self, bundle: &BundleHandle) {
        self(bundle)
    }
}

/// TUIO 2.0 client: owns the receiving endpoint and the processing chain.
pub struct Client {
    socket: Option<UdpSocket>,
    codec: Codec,
    assembler: BundleAssembler,
    stack: BundleStack,
    adaptors: Vec<Box<dyn Adaptor>>,
    listeners: Vec<Box<dyn Listener>>,
}

impl Client {
    /// Bind a UDP receiving endpoint on the given port.
    pub async fn bind(port: u16, accept_unknown: bool) -> Result<Self, Error> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Client {
            socket: Some(socket),
            codec: Codec::new(accept_unknown, TreeCompat::default()),
            assembler: BundleAssembler::new(),
            stack: BundleStack::new(),
            adaptors: Vec::new(),
            listeners: Vec::new(),
        })
    }

    /// A client without a socket; bundles are fed in with
    /// [`Client::process_packet`]. Used by embedders that own the transport.
    pub fn detached(accept_unknown: bool) -> Self {
        Client {
            socket: None,
            codec: Codec::new(accept_unknown, TreeCompat::default()),
            assembler: BundleAssembler::new(),
            stack: BundleStack::new(),
            adaptors: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }

    /// Append an adaptor to the end of the processing chain.
    pub fn add_adaptor(&mut self, adaptor: impl Adaptor + 'static) {
        self.adaptors.push(Box::new(adaptor));
    }

    /// Register a terminal listener; notification order is registration
    /// order.
    pub fn add_listener(&mut self, listener: impl Listener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Bundles delivered by the last load round.
    pub fn stack(&self) -> &BundleStack {
        &self.stack
    }

    pub fn take_stack(&mut self) -> BundleStack {
        std::mem::take(&mut self.stack)
    }

    /// Read up to `count` complete bundles or until `timeout` elapses.
    ///
    /// Parse failures are logged and skipped; socket errors surface as
    /// [`Error::Net`]. Returns the number of bundles delivered.
    pub async fn load(&mut self, count: usize, timeout: Duration) -> Result<usize, Error> {
        if self.socket.is_none() {
            return Err(Error::Config("client has no receiving socket".into()));
        }
        self.stack.clear();

        let deadline = Instant::now() + timeout;
        let mut delivered = 0usize;
        let mut buf = vec![0u8; 65536];

        while delivered < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let socket = self.socket.as_ref().unwrap();
            match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Err(err)) => return Err(Error::Net(err)),
                Ok(Ok((len, _src))) => {
                    let data = buf[..len].to_vec();
                    delivered += self.process_packet(&data);
                }
            }
        }

        self.flush_adaptors();
        Ok(delivered)
    }

    /// Decode one datagram and dispatch every completed bundle; returns the
    /// number of bundles delivered.
    pub fn process_packet(&mut self, data: &[u8]) -> usize {
        let messages = match self.codec.decode(data, |err| warn!("dropped message: {err}")) {
            Ok(messages) => messages,
            Err(err) => {
                warn!("dropped packet: {err}");
                return 0;
            }
        };

        let mut delivered = 0;
        for message in messages {
            if let Some(bundle) = self.assembler.push(message) {
                if self.dispatch(bundle, 0) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Run one bundle through the chain starting at `first_adaptor`,
    /// then notify listeners and stack it. Returns false if the bundle was
    /// dropped on the way.
    fn dispatch(&mut self, bundle: BundleHandle, first_adaptor: usize) -> bool {
        let mut current = bundle;
        for adaptor in self.adaptors.iter_mut().skip(first_adaptor) {
            match adaptor.process_bundle(&current) {
                Ok(output) => current = output,
                Err(err) => {
                    warn!("adaptor dropped bundle: {err}");
                    return false;
                }
            }
            if current.is_empty() {
                return false;
            }
        }
        for listener in self.listeners.iter_mut() {
            listener.on_bundle(&current);
        }
        self.stack.append(current)
    }

    /// Give every adaptor its end-of-round tick; emitted bundles continue
    /// through the chain below the emitting adaptor.
    fn flush_adaptors(&mut self) {
        for index in 0..self.adaptors.len() {
            let flushed = self.adaptors[index].flush();
            for bundle in flushed {
                self.dispatch(bundle, index + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Frame, Message, Pointer};
    use crate::types::Timetag;
    use std::sync::{Arc, Mutex};

    fn encode(messages: Vec<Message>) -> Vec<u8> {
        let mut handle = BundleHandle::new();
        for msg in messages {
            handle.push(msg);
        }
        Codec::default().encode(&handle).unwrap()
    }

    fn pointer_bundle(frame_id: u32, sid: u32) -> Vec<u8> {
        encode(vec![
            Message::Frame(Frame::new(frame_id, Timetag::new(1, 0))),
            Message::Pointer(Pointer::new_2d(sid, 0, 0, 0, 0.5, 0.5, 0.0, 1.0)),
            Message::Alive(Alive::new([sid].into_iter().collect())),
        ])
    }

    #[test]
    fn test_process_packet_delivers_in_order() {
        let mut client = Client::detached(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.add_listener(move |bundle: &BundleHandle| {
            sink.lock().unwrap().push(bundle.frame().unwrap().frame_id);
        });

        assert_eq!(client.process_packet(&pointer_bundle(1, 10)), 1);
        assert_eq!(client.process_packet(&pointer_bundle(2, 10)), 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(client.stack().len(), 2);
    }

    #[test]
    fn test_listener_sees_envelope() {
        let mut client = Client::detached(false);
        client.add_listener(|bundle: &BundleHandle| {
            assert!(bundle.frame().is_some());
            assert!(bundle.alive().is_some());
        });
        client.process_packet(&pointer_bundle(1, 1));
    }

    struct Dropper;
    impl Adaptor for Dropper {
        fn process_bundle(&mut self, _bundle: &BundleHandle) -> Result<BundleHandle, Error> {
            Ok(BundleHandle::new())
        }
    }

    #[test]
    fn test_empty_adaptor_output_is_dropped() {
        let mut client = Client::detached(false);
        client.add_adaptor(Dropper);
        assert_eq!(client.process_packet(&pointer_bundle(1, 1)), 0);
        assert!(client.stack().is_empty());
    }

    #[tokio::test]
    async fn test_load_times_out_without_traffic() {
        let mut client = Client::bind(0, false).await.unwrap();
        let delivered = client.load(1, Duration::from_millis(30)).await.unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_load_receives_datagram() {
        let mut client = Client::bind(0, false).await.unwrap();
        let addr = client.socket.as_ref().unwrap().local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let data = pointer_bundle(7, 3);
        sender.send_to(&data, ("127.0.0.1", addr.port())).await.unwrap();

        let delivered = client.load(1, Duration::from_millis(500)).await.unwrap();
        assert_eq!(delivered, 1);
        let bundle = client.take_stack().get_update(crate::bundle::StackIndex::Oldest).unwrap();
        assert_eq!(bundle.frame().unwrap().frame_id, 7);
    }
}
