//! NatNet 클라이언트 (연결 관리 + 공개 API)
//!
//! 연결 흐름:
//! 1. 명령 소켓 / 데이터 소켓 생성
//! 2. 백그라운드 루프 시작
//! 3. CONNECT 전송
//! 4. SERVER_INFO 수신까지 대기 (타임아웃 시 전부 정리)
//! 5. 유니캐스트면 keep-alive 시작

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use crate::background::{LoopHandle, Sockets};
use crate::dispatcher::{Dispatcher, Shared};
use crate::frames::{FrameStream, Frames};
use crate::message::{encode_request, MessageType, Response, ServerInfo};
use crate::unpacker::{RawUnpacker, Unpacker};
use crate::{Config, Error, Result};

/// `send_command` 재시도 횟수
pub const SEND_COMMAND_ATTEMPTS: usize = 3;

/// 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingServerInfo,
    Ready,
    ShuttingDown,
}

/// NatNet 클라이언트
///
/// 모든 메서드는 `&self`라서 여러 스레드에서 `Arc`로 공유 가능.
pub struct NatNetClient<U: Unpacker = RawUnpacker> {
    config: Config,
    unpacker: Mutex<U>,
    state: Mutex<ConnectionState>,
    shared: Arc<Shared<U::Frame, U::Descriptors>>,
    io: Mutex<Option<LoopHandle>>,
}

impl NatNetClient<RawUnpacker> {
    /// 페이로드를 해석하지 않는 클라이언트 생성
    pub fn new(config: Config) -> Self {
        Self::with_unpacker(config, RawUnpacker)
    }
}

impl<U: Unpacker> NatNetClient<U> {
    /// 디코더를 지정해 클라이언트 생성
    pub fn with_unpacker(config: Config, unpacker: U) -> Self {
        let shared = Arc::new(Shared::new(config.max_buffer_size));
        Self {
            config,
            unpacker: Mutex::new(unpacker),
            state: Mutex::new(ConnectionState::Disconnected),
            shared,
            io: Mutex::new(None),
        }
    }

    /// 생성 + `config.connection_timeout`으로 연결
    ///
    /// 서버가 응답하지 않으면 None
    pub fn open(config: Config, unpacker: U) -> Result<Option<Self>> {
        let client = Self::with_unpacker(config, unpacker);
        let timeout = client.config.connection_timeout;
        if client.connect(timeout)? {
            Ok(Some(client))
        } else {
            Ok(None)
        }
    }

    /// 서버 연결
    ///
    /// SERVER_INFO를 받으면 true, 타임아웃이나 소켓/설정 에러면 false.
    /// false일 때는 소켓과 스레드가 모두 정리되어 다시 시도해도 안전하다.
    /// 이미 연결되어 있으면 `Error::AlreadyConnected`.
    pub fn connect(&self, timeout: Option<Duration>) -> Result<bool> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::AlreadyConnected(*state));
            }
            *state = ConnectionState::Connecting;
        }

        match self.establish(timeout) {
            Ok(handle) => {
                *self.io.lock() = Some(handle);
                self.set_state(ConnectionState::Ready);
                info!("클라이언트 연결됨: {}", self.config.server_command_addr());
                Ok(true)
            }
            Err(e) => {
                error!("연결 실패: {}\n서버 모드(멀티캐스트/유니캐스트) 설정을 확인하세요.\n{:?}", e, self.config);
                self.shared.reset_session();
                self.set_state(ConnectionState::Disconnected);
                Ok(false)
            }
        }
    }

    /// 실패하면 만든 것 전부 drop (LoopHandle drop이 스레드 join)
    fn establish(&self, timeout: Option<Duration>) -> Result<LoopHandle> {
        self.config.validate()?;

        let sockets = create_sockets(&self.config)?;
        debug!("명령/데이터 소켓 생성 완료");

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let dispatcher = Dispatcher::new(
            self.unpacker.lock().clone(),
            self.shared.clone(),
            self.config.use_multicast,
            ready_tx,
        );
        let handle = LoopHandle::spawn(self.config.clone(), sockets, dispatcher)?;

        self.set_state(ConnectionState::AwaitingServerInfo);
        handle.send(encode_request(MessageType::Connect, "")?)?;

        match timeout {
            Some(timeout) => ready_rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout(timeout),
                RecvTimeoutError::Disconnected => Error::ConnectionClosed,
            })?,
            None => ready_rx.recv().map_err(|_| Error::ConnectionClosed)?,
        }

        if !self.config.use_multicast {
            handle.start_keep_alive()?;
        }

        Ok(handle)
    }

    /// 연결 종료
    ///
    /// 루프에 종료 신호를 보내고 끝날 때까지 기다린 뒤 소켓을 닫는다.
    /// 대기 중인 프레임 소비자도 모두 끝난다.
    pub fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Ready {
                return Err(Error::NotConnected);
            }
            *state = ConnectionState::ShuttingDown;
        }
        info!("클라이언트 종료 중");

        let handle = self.io.lock().take();
        if let Some(mut handle) = handle {
            handle.stop();
        }

        self.shared.reset_session();
        self.set_state(ConnectionState::Disconnected);
        info!("클라이언트 종료 완료");
        Ok(())
    }

    /// 서버로 요청 전송, 보낸 바이트 수 반환
    pub fn send_request(&self, msg_type: MessageType, body: &str) -> Result<usize> {
        if self.state() != ConnectionState::Ready {
            return Err(Error::NotConnected);
        }
        let packet = encode_request(msg_type, body)?;

        let sender = self
            .io
            .lock()
            .as_ref()
            .map(LoopHandle::sender)
            .ok_or(Error::NotConnected)?;
        sender.send(packet)
    }

    /// 문자열 명령 전송 (최대 3회 시도)
    ///
    /// 연결되어 있지 않으면 에러, 전송 실패는 false
    pub fn send_command(&self, command: &str) -> Result<bool> {
        for attempt in 1..=SEND_COMMAND_ATTEMPTS {
            match self.send_request(MessageType::Request, command) {
                Ok(_) => return Ok(true),
                Err(e @ (Error::NotConnected | Error::UndefinedRequest)) => return Err(e),
                Err(e) => {
                    warn!(
                        "명령 전송 실패 ({}/{}): {}",
                        attempt, SEND_COMMAND_ATTEMPTS, e
                    );
                }
            }
        }
        Ok(false)
    }

    /// 새 프레임 블로킹 Iterator
    pub fn frames(&self, timeout: Option<Duration>) -> Frames<U::Frame> {
        Frames::new(self.shared.frames.clone(), timeout)
    }

    /// 새 프레임 async 스트림
    ///
    /// 이미 다른 스트림이 있으면 `Error::ConsumerBusy`
    pub fn frame_stream(&self, timeout: Option<Duration>) -> Result<FrameStream<U::Frame>> {
        FrameStream::new(self.shared.frames.clone(), timeout)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// 서버 정보 (Ready 상태에서만 Some)
    pub fn server_info(&self) -> Option<ServerInfo> {
        if self.state() != ConnectionState::Ready {
            return None;
        }
        self.shared.server_info.read().clone()
    }

    /// 최신 모델 정의
    pub fn descriptors(&self) -> Option<Arc<U::Descriptors>> {
        self.shared.descriptors.read().clone()
    }

    /// 마지막 프레임 도착 시각
    pub fn last_frame_time(&self) -> Option<SystemTime> {
        *self.shared.last_frame_time.read()
    }

    /// 현재 프레임 (대기 없음)
    pub fn last_frame(&self) -> Option<Arc<U::Frame>> {
        self.shared.frames.latest()
    }

    /// 서버 응답 버퍼 복사본
    pub fn responses(&self) -> Vec<Response> {
        self.shared.responses.lock().snapshot()
    }

    /// 서버 메시지 버퍼 복사본
    pub fn messages(&self) -> Vec<String> {
        self.shared.messages.lock().snapshot()
    }

    /// 비트스트림 변경 가능 여부 (NatNet 4+ 유니캐스트)
    pub fn can_change_bitstream(&self) -> bool {
        self.state() == ConnectionState::Ready
            && self.shared.can_change_bitstream.load(Ordering::SeqCst)
    }
}

impl<U: Unpacker> Drop for NatNetClient<U> {
    fn drop(&mut self) {
        if self.state() == ConnectionState::Ready {
            let _ = self.shutdown();
        }
    }
}

fn create_sockets(config: &Config) -> Result<Sockets> {
    let command = create_command_socket(config)?;
    let data = create_data_socket(config)?;
    Ok(Sockets { command, data })
}

/// SO_REUSEADDR UDP 소켓 바인드
///
/// 같은 호스트의 여러 클라이언트가 멀티캐스트 데이터 포트를 공유할 수 있게
/// 바인드 전에 주소 재사용을 켠다.
fn bind_reusable(addr: SocketAddrV4) -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::V4(addr).into())?;
    Ok(socket)
}

/// 명령 소켓
///
/// 유니캐스트: 로컬 주소의 임의 포트, 멀티캐스트: 전체 인터페이스 + 브로드캐스트
fn create_command_socket(config: &Config) -> Result<UdpSocket> {
    let ip = if config.use_multicast {
        Ipv4Addr::UNSPECIFIED
    } else {
        config.local_address
    };

    let socket = bind_reusable(SocketAddrV4::new(ip, 0)).map_err(|e| {
        error!("명령 소켓 바인드 실패 ({}:0): {}", ip, e);
        e
    })?;
    if config.use_multicast {
        socket.set_broadcast(true)?;
    }
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// 데이터 소켓
///
/// 멀티캐스트: data_port에 바인드 후 그룹 가입, 유니캐스트: 로컬 주소의 data_port
fn create_data_socket(config: &Config) -> Result<UdpSocket> {
    let ip = if config.use_multicast {
        Ipv4Addr::UNSPECIFIED
    } else {
        config.local_address
    };

    let socket = bind_reusable(SocketAddrV4::new(ip, config.data_port)).map_err(|e| {
        error!("데이터 소켓 바인드 실패 ({}:{}): {}", ip, config.data_port, e);
        e
    })?;

    if config.use_multicast {
        socket
            .join_multicast_v4(&config.multicast_address, &config.local_address)
            .map_err(|e| {
                error!(
                    "멀티캐스트 그룹 가입 실패 ({} via {}): {}",
                    config.multicast_address, config.local_address, e
                );
                e
            })?;
    }
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{encode_packet, MessageHeader};
    use crate::unpacker::DecoderVersion;
    use crate::DEFAULT_MULTICAST_GROUP;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Instant;

    /// 루프백 가짜 서버
    struct FakeServer {
        addr: SocketAddr,
        stop: Arc<AtomicBool>,
        thread: Option<thread::JoinHandle<Vec<MessageType>>>,
    }

    impl FakeServer {
        /// `answer`가 false면 CONNECT에 응답하지 않음
        fn start(answer: bool, nat_net: (u8, u8)) -> Self {
            let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            socket
                .set_read_timeout(Some(Duration::from_millis(20)))
                .unwrap();
            let addr = socket.local_addr().unwrap();
            let stop = Arc::new(AtomicBool::new(false));
            let stop_flag = stop.clone();

            let thread = thread::spawn(move || {
                let mut seen = Vec::new();
                let mut buf = [0u8; 2048];
                let mut frame_counter = 0u8;

                while !stop_flag.load(Ordering::SeqCst) {
                    let Ok((len, peer)) = socket.recv_from(&mut buf) else {
                        continue;
                    };
                    let Ok((header, payload)) = MessageHeader::decode(&buf[..len]) else {
                        continue;
                    };
                    seen.push(header.msg_type);

                    let reply = match header.msg_type {
                        MessageType::Connect if answer => {
                            let info = ServerInfo {
                                application_name: "FakeMotive".into(),
                                version: [3, 1, 0, 0],
                                nat_net_major: nat_net.0,
                                nat_net_minor: nat_net.1,
                            };
                            Some(encode_packet(MessageType::ServerInfo, &info.to_payload()).unwrap())
                        }
                        MessageType::RequestFrameOfData => {
                            frame_counter += 1;
                            Some(encode_packet(MessageType::FrameOfData, &[frame_counter]).unwrap())
                        }
                        MessageType::RequestModelDef => {
                            Some(encode_packet(MessageType::ModelDef, b"models").unwrap())
                        }
                        MessageType::Request => {
                            let text = crate::message::read_cstr(payload);
                            if text.starts_with("Bitstream") {
                                let mut body = text.into_bytes();
                                body.push(0);
                                Some(encode_packet(MessageType::Response, &body).unwrap())
                            } else {
                                Some(encode_packet(MessageType::Response, &0i32.to_le_bytes()).unwrap())
                            }
                        }
                        _ => None,
                    };

                    if let Some(reply) = reply {
                        let _ = socket.send_to(&reply, peer);
                    }
                }
                seen
            });

            Self {
                addr,
                stop,
                thread: Some(thread),
            }
        }

        fn config(&self) -> Config {
            Config {
                command_port: self.addr.port(),
                data_port: 0,
                recv_timeout: Duration::from_millis(200),
                ..Config::unicast(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            }
        }

        /// 루프백 인터페이스로 그룹에 가입하는 멀티캐스트 설정
        fn multicast_config(&self, data_port: u16) -> Config {
            Config {
                server_address: Ipv4Addr::LOCALHOST,
                local_address: Ipv4Addr::LOCALHOST,
                multicast_address: DEFAULT_MULTICAST_GROUP,
                command_port: self.addr.port(),
                data_port,
                recv_timeout: Duration::from_millis(200),
                ..Config::multicast()
            }
        }

        fn finish(mut self) -> Vec<MessageType> {
            self.stop.store(true, Ordering::SeqCst);
            self.thread.take().unwrap().join().unwrap()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_connect_and_shutdown() {
        let server = FakeServer::start(true, (4, 1));
        let client = NatNetClient::new(server.config());

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.server_info().is_none());

        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());
        assert_eq!(client.state(), ConnectionState::Ready);

        let info = client.server_info().unwrap();
        assert_eq!(info.application_name, "FakeMotive");
        assert_eq!((info.nat_net_major, info.nat_net_minor), (4, 1));
        assert!(client.can_change_bitstream());

        // 유니캐스트는 연결 직후 keep-alive를 보냄
        thread::sleep(Duration::from_millis(100));

        client.shutdown().unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.server_info().is_none());

        // 두 번째 shutdown은 에러
        assert!(matches!(client.shutdown(), Err(Error::NotConnected)));

        let seen = server.finish();
        assert_eq!(seen.first(), Some(&MessageType::Connect));
        assert!(seen.contains(&MessageType::KeepAlive));
    }

    #[test]
    fn test_connect_twice_fails_loudly() {
        let server = FakeServer::start(true, (4, 1));
        let client = NatNetClient::new(server.config());

        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());
        assert!(matches!(
            client.connect(Some(Duration::from_secs(2))),
            Err(Error::AlreadyConnected(ConnectionState::Ready))
        ));

        client.shutdown().unwrap();
        server.finish();
    }

    #[test]
    fn test_connect_timeout_leaves_clean_state() {
        let server = FakeServer::start(false, (4, 1));
        let client = NatNetClient::new(server.config());

        let start = Instant::now();
        assert!(!client.connect(Some(Duration::from_millis(300))).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(300));

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.server_info().is_none());
        assert!(matches!(client.shutdown(), Err(Error::NotConnected)));

        // 재시도 가능
        assert!(!client.connect(Some(Duration::from_millis(100))).unwrap());

        let seen = server.finish();
        assert_eq!(
            seen.iter().filter(|t| **t == MessageType::Connect).count(),
            2
        );
    }

    #[test]
    fn test_invalid_config_fails_connect() {
        let config = Config {
            multicast_address: Ipv4Addr::new(10, 1, 2, 3),
            ..Config::multicast()
        };
        let client = NatNetClient::new(config);

        assert!(!client.connect(Some(Duration::from_millis(100))).unwrap());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_requests_require_connection() {
        let client = NatNetClient::new(Config::default());

        assert!(matches!(
            client.send_request(MessageType::Request, "x"),
            Err(Error::NotConnected)
        ));
        assert!(matches!(client.send_command("x"), Err(Error::NotConnected)));
    }

    #[test]
    fn test_frames_and_descriptors_over_loopback() {
        let server = FakeServer::start(true, (3, 0));
        let client = NatNetClient::new(server.config());
        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());

        let mut frames = client.frames(Some(Duration::from_secs(2)));
        for expected in 1..=3u8 {
            client
                .send_request(MessageType::RequestFrameOfData, "")
                .unwrap();
            let frame = frames.next().unwrap();
            assert_eq!(&frame.payload[..], &[expected]);
            assert_eq!(frame.version, DecoderVersion::V3_0);
        }
        assert!(client.last_frame_time().is_some());

        client.send_request(MessageType::RequestModelDef, "").unwrap();
        assert!(wait_until(|| client.descriptors().is_some()));
        assert_eq!(&client.descriptors().unwrap().payload[..], b"models");

        client.shutdown().unwrap();
        server.finish();
    }

    #[test]
    fn test_bitstream_command_switches_decoder() {
        let server = FakeServer::start(true, (3, 0));
        let client = NatNetClient::new(server.config());
        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());

        assert!(client.send_command("Bitstream,4.1").unwrap());
        assert!(wait_until(|| !client.responses().is_empty()));
        assert_eq!(
            client.responses(),
            vec![Response::Text("Bitstream,4.1".into())]
        );

        let info = client.server_info().unwrap();
        assert_eq!((info.nat_net_major, info.nat_net_minor), (4, 1));

        let mut frames = client.frames(Some(Duration::from_secs(2)));
        client
            .send_request(MessageType::RequestFrameOfData, "")
            .unwrap();
        assert_eq!(frames.next().unwrap().version, DecoderVersion::V4_1);

        client.shutdown().unwrap();
        server.finish();
    }

    #[test]
    fn test_shutdown_ends_blocking_consumer() {
        let server = FakeServer::start(true, (4, 1));
        let client = Arc::new(NatNetClient::new(server.config()));
        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());

        let mut frames = client.frames(None);
        let consumer = thread::spawn(move || frames.next());

        thread::sleep(Duration::from_millis(50));
        client.shutdown().unwrap();

        assert!(consumer.join().unwrap().is_none());
        server.finish();
    }

    #[test]
    fn test_open_uses_config_timeout() {
        let server = FakeServer::start(false, (4, 1));
        let config = Config {
            connection_timeout: Some(Duration::from_millis(100)),
            ..server.config()
        };

        assert!(NatNetClient::open(config, RawUnpacker).unwrap().is_none());
        server.finish();
    }

    #[tokio::test]
    async fn test_frame_stream_over_loopback() {
        let server = FakeServer::start(true, (4, 1));
        let client = NatNetClient::new(server.config());
        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());

        let mut stream = client.frame_stream(Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(
            client.frame_stream(None),
            Err(Error::ConsumerBusy)
        ));

        client
            .send_request(MessageType::RequestFrameOfData, "")
            .unwrap();
        let frame = stream.next().await.unwrap();
        assert_eq!(&frame.payload[..], &[1]);
        assert_eq!(frame.version, DecoderVersion::V4_1);

        drop(stream);
        client.shutdown().unwrap();
        server.finish();
    }

    /// 지금 비어 있는 UDP 포트
    fn free_port() -> u16 {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_multicast_connect_skips_keep_alive() {
        let server = FakeServer::start(true, (4, 1));
        let client = NatNetClient::new(server.multicast_config(0));

        assert!(client.connect(Some(Duration::from_secs(2))).unwrap());
        assert!(client.server_info().is_some());
        // 멀티캐스트에서는 비트스트림 변경 불가
        assert!(!client.can_change_bitstream());

        let mut frames = client.frames(Some(Duration::from_secs(2)));
        client
            .send_request(MessageType::RequestFrameOfData, "")
            .unwrap();
        assert_eq!(&frames.next().unwrap().payload[..], &[1]);

        // 유니캐스트라면 이 사이에 keep-alive가 나갔을 시간
        thread::sleep(Duration::from_millis(150));
        client.shutdown().unwrap();

        let seen = server.finish();
        assert!(seen.contains(&MessageType::Connect));
        assert!(!seen.contains(&MessageType::KeepAlive));
    }

    #[test]
    fn test_multicast_clients_share_data_port() {
        let server = FakeServer::start(true, (4, 1));
        let port = free_port();

        let first = NatNetClient::new(server.multicast_config(port));
        let second = NatNetClient::new(server.multicast_config(port));

        assert!(first.connect(Some(Duration::from_secs(2))).unwrap());
        assert!(second.connect(Some(Duration::from_secs(2))).unwrap());
        assert_eq!(first.state(), ConnectionState::Ready);
        assert_eq!(second.state(), ConnectionState::Ready);

        first.shutdown().unwrap();
        second.shutdown().unwrap();

        let seen = server.finish();
        assert_eq!(
            seen.iter().filter(|t| **t == MessageType::Connect).count(),
            2
        );
        assert!(!seen.contains(&MessageType::KeepAlive));
    }

    #[test]
    fn test_multicast_data_socket_receives_group_traffic() {
        let port = free_port();
        let config = Config {
            local_address: Ipv4Addr::LOCALHOST,
            data_port: port,
            ..Config::multicast()
        };

        let data = create_data_socket(&config).unwrap();
        assert_eq!(data.local_addr().unwrap().port(), port);
        data.set_nonblocking(false).unwrap();
        data.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        // 같은 포트에 두 번째 소켓도 바인드 가능
        let _shared = create_data_socket(&config).unwrap();

        let sender = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        sender.set_multicast_if_v4(&Ipv4Addr::LOCALHOST).unwrap();
        sender.set_multicast_loop_v4(true).unwrap();
        let group = SocketAddr::from((config.multicast_address, port));
        sender.send_to(b"group-frame", &group.into()).unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = data.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"group-frame");
    }
}
