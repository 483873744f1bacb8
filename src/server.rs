//! Sending side of the pipeline: staged messages are wrapped in a fresh
//! frame/alive envelope, run through server-side adaptors, and emitted as
//! one OSC bundle over UDP or TCP.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tracing::warn;

use crate::adaptors::ServerAdaptor;
use crate::bundle::BundleHandle;
use crate::codec::Codec;
use crate::error::Error;
use crate::messages::{Alive, Frame, Message};
use crate::types::{Dimension, FrameId, InstanceId, SessionId, SessionSet, Timetag};

enum Transport {
    Udp { socket: UdpSocket, target: SocketAddr },
    /// OSC over a stream transport uses an int32 big-endian length prefix.
    Tcp(TcpStream),
    None,
}

/// TUIO 2.0 server: staging handle, session id pool and send path.
pub struct Server {
    transport: Transport,
    codec: Codec,
    staging: Vec<Message>,
    registered: SessionSet,
    next_session_id: SessionId,
    next_frame_id: FrameId,
    app_name: String,
    address: u32,
    instance: InstanceId,
    sensor_width: Dimension,
    sensor_height: Dimension,
    adaptors: Vec<Box<dyn ServerAdaptor>>,
}

impl Server {
    pub fn new(app_name: impl Into<String>, address: u32, instance: InstanceId) -> Self {
        Server {
            transport: Transport::None,
            codec: Codec::default(),
            staging: Vec::new(),
            registered: SessionSet::new(),
            next_session_id: 1,
            next_frame_id: 1,
            app_name: app_name.into(),
            address,
            instance,
            sensor_width: 0,
            sensor_height: 0,
            adaptors: Vec::new(),
        }
    }

    pub async fn connect_udp(&mut self, target: SocketAddr) -> Result<(), Error> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        self.transport = Transport::Udp { socket, target };
        Ok(())
    }

    pub async fn connect_tcp(&mut self, target: SocketAddr) -> Result<(), Error> {
        let stream = TcpStream::connect(target).await?;
        self.transport = Transport::Tcp(stream);
        Ok(())
    }

    pub fn set_sensor_dimensions(&mut self, width: Dimension, height: Dimension) {
        self.sensor_width = width;
        self.sensor_height = height;
    }

    pub fn add_adaptor(&mut self, adaptor: impl ServerAdaptor + 'static) {
        self.adaptors.push(Box::new(adaptor));
    }

    /// Allocate a fresh session id from the monotonic pool and register it.
    pub fn next_session_id(&mut self) -> SessionId {
        let sid = self.next_session_id;
        self.next_session_id += 1;
        self.registered.insert(sid);
        sid
    }

    pub fn register_session_id(&mut self, sid: SessionId) {
        self.registered.insert(sid);
    }

    pub fn unregister_session_id(&mut self, sid: SessionId) {
        self.registered.remove(&sid);
    }

    pub fn registered_session_ids(&self) -> &SessionSet {
        &self.registered
    }

    /// Queue a clone of the message into the staging handle.
    pub fn append(&mut self, message: &Message) {
        self.staging.push(message.clone());
    }

    /// Build the outgoing bundle: fresh frame envelope, staged middle
    /// messages, alive synthesized from the registered session set.
    fn assemble(&mut self) -> BundleHandle {
        let frame = Frame::extended(
            self.next_frame_id,
            Timetag::now(),
            self.app_name.clone(),
            self.address,
            self.instance,
            self.sensor_width,
            self.sensor_height,
        );
        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        let middle = std::mem::take(&mut self.staging);
        BundleHandle::assemble(frame, middle, Alive::new(self.registered.clone()))
    }

    /// Wrap, process and transmit the staged bundle.
    ///
    /// Transient transport errors are retried once; persistent errors
    /// surface as [`Error::Net`].
    pub async fn send(&mut self) -> Result<(), Error> {
        let mut bundle = self.assemble();
        for adaptor in self.adaptors.iter_mut() {
            adaptor.process_bundle(&mut bundle)?;
        }
        let data = self.codec.encode(&bundle)?;

        match self.transmit(&data).await {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("send failed, retrying once: {first}");
                self.transmit(&data).await
            }
        }
    }

    async fn transmit(&mut self, data: &[u8]) -> Result<(), Error> {
        match &mut self.transport {
            Transport::Udp { socket, target } => {
                socket.send_to(data, *target).await?;
                Ok(())
            }
            Transport::Tcp(stream) => {
                stream.write_all(&(data.len() as i32).to_be_bytes()).await?;
                stream.write_all(data).await?;
                Ok(())
            }
            Transport::None => Err(Error::Config("server has no transport".into())),
        }
    }

    /// Assemble and process without transmitting; used by embedders that
    /// own the transport (and by tests).
    pub fn produce(&mut self) -> Result<BundleHandle, Error> {
        let mut bundle = self.assemble();
        for adaptor in self.adaptors.iter_mut() {
            adaptor.process_bundle(&mut bundle)?;
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Pointer;

    #[test]
    fn test_produce_wraps_envelope() {
        let mut server = Server::new("test-source", 0x7f000001, 1);
        server.set_sensor_dimensions(1920, 1080);
        let sid = server.next_session_id();
        server.append(&Message::Pointer(Pointer::new_2d(sid, 0, 0, 0, 0.5, 0.5, 0.0, 1.0)));

        let bundle = server.produce().unwrap();
        assert!(bundle.is_well_formed());
        assert_eq!(bundle.len(), 3);
        let frame = bundle.frame().unwrap();
        assert_eq!(frame.app_name, "test-source");
        assert_eq!(frame.sensor_width, 1920);
        assert!(bundle.alive().unwrap().contains(sid));
    }

    #[test]
    fn test_session_pool_monotonic() {
        let mut server = Server::new("s", 0, 0);
        let a = server.next_session_id();
        let b = server.next_session_id();
        assert!(b > a);
        server.unregister_session_id(a);
        let bundle = server.produce().unwrap();
        assert!(!bundle.alive().unwrap().contains(a));
        assert!(bundle.alive().unwrap().contains(b));
    }

    #[test]
    fn test_frame_ids_advance() {
        let mut server = Server::new("s", 0, 0);
        let first = server.produce().unwrap().frame().unwrap().frame_id;
        let second = server.produce().unwrap().frame().unwrap().frame_id;
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_staging_cleared_after_produce() {
        let mut server = Server::new("s", 0, 0);
        server.append(&Message::Pointer(Pointer::new_2d(1, 0, 0, 0, 0.5, 0.5, 0.0, 1.0)));
        let first = server.produce().unwrap();
        assert_eq!(first.len(), 3);
        let second = server.produce().unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_udp_send_reaches_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let mut server = Server::new("s", 0, 0);
        server.connect_udp(target).await.unwrap();
        server.send().await.unwrap();

        let mut buf = vec![0u8; 65536];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..8], b"#bundle\0");
        assert!(len > 8);
    }
}
