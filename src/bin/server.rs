//! NatNet mock 서버 - 로컬 테스트용 가짜 모션 캡처 서버
//!
//! - CONNECT → SERVER_INFO
//! - REQUEST → RESPONSE (정수 0, `Bitstream,<v>`는 그대로 돌려줌)
//! - REQUEST_MODEL_DEF → 빈 MODEL_DEF
//! - 연결된 클라이언트로 가짜 FRAME_OF_DATA 스트리밍
//!
//! 사용법:
//!   cargo run --release --bin natnet-mock-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 (127.0.0.1:1510, 100fps)
//!   cargo run --release --bin natnet-mock-server
//!
//!   # NatNet 3.0 서버 흉내, 240fps
//!   cargo run --release --bin natnet-mock-server -- --natnet 3.0 --rate 240

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use natnet::message::{encode_packet, read_cstr, MAX_PAYLOAD_SIZE};
use natnet::{MessageHeader, MessageType, Response, ServerInfo};

/// 서버 설정
struct ServerArgs {
    bind_addr: SocketAddr,
    app_name: String,
    nat_net: (u8, u8),
    rate: f64,
    frame_size: usize,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], natnet::DEFAULT_COMMAND_PORT)),
            app_name: "NatNet Mock".into(),
            nat_net: (4, 1),
            rate: 100.0,
            frame_size: 256,
        }
    }
}

fn parse_args() -> ServerArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ServerArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--name" => {
                if i + 1 < args.len() {
                    config.app_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--natnet" => {
                if i + 1 < args.len() {
                    let (major, minor) = args[i + 1]
                        .split_once('.')
                        .expect("major.minor 형식 필요");
                    config.nat_net = (
                        major.parse().expect("유효한 숫자 필요"),
                        minor.parse().expect("유효한 숫자 필요"),
                    );
                    i += 1;
                }
            }
            "--rate" | "-r" => {
                if i + 1 < args.len() {
                    config.rate = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--frame-size" => {
                if i + 1 < args.len() {
                    config.frame_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"NatNet Mock Server - 로컬 테스트용 가짜 서버

사용법:
  cargo run --release --bin natnet-mock-server -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       명령 소켓 주소 (기본: 127.0.0.1:1510)
  --name <NAME>           SERVER_INFO 애플리케이션 이름 (기본: NatNet Mock)
  --natnet <MAJ.MIN>      보고할 NatNet 버전 (기본: 4.1)
  -r, --rate <FPS>        프레임 전송 속도 (기본: 100, 0이면 요청 시에만)
  --frame-size <BYTES>    프레임 페이로드 크기 (기본: 256)
  -h, --help              이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();
    if args.frame_size > MAX_PAYLOAD_SIZE {
        return Err(format!(
            "--frame-size {}는 최대 {} bytes",
            args.frame_size, MAX_PAYLOAD_SIZE
        )
        .into());
    }

    let socket = Arc::new(UdpSocket::bind(args.bind_addr).await?);
    info!("NatNet Mock Server listening on {}", socket.local_addr()?);
    info!(
        "Reporting NatNet {}.{}, {} fps",
        args.nat_net.0, args.nat_net.1, args.rate
    );

    let mut info = ServerInfo {
        application_name: args.app_name.clone(),
        version: [3, 1, 0, 0],
        nat_net_major: args.nat_net.0,
        nat_net_minor: args.nat_net.1,
    };

    let mut stream_task: Option<JoinHandle<()>> = None;
    let mut frame_number = 0u32;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        // 클라이언트가 사라지면 ICMP 에러가 recv로 올라오는 플랫폼이 있음
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("수신 에러: {}", e);
                continue;
            }
        };

        let (header, payload) = match MessageHeader::decode(&buf[..len]) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("잘못된 패킷 ({}): {}", peer, e);
                continue;
            }
        };

        let reply = match header.msg_type {
            MessageType::Connect => {
                info!("CONNECT from {}", peer);
                if let Some(task) = stream_task.take() {
                    task.abort();
                }
                if args.rate > 0.0 {
                    stream_task = Some(tokio::spawn(stream_frames(
                        socket.clone(),
                        peer,
                        args.rate,
                        args.frame_size,
                    )));
                }
                Some(encode_packet(MessageType::ServerInfo, &info.to_payload()))
            }
            MessageType::KeepAlive => {
                debug!("KEEP_ALIVE from {}", peer);
                None
            }
            MessageType::Request => {
                let command = read_cstr(payload);
                info!("REQUEST from {}: {:?}", peer, command);

                let response = Response::Text(command.clone());
                if let Some((major, minor)) = response.bitstream_version() {
                    info.nat_net_major = major;
                    info.nat_net_minor = minor;
                    let mut body = command.into_bytes();
                    body.push(0);
                    Some(encode_packet(MessageType::Response, &body))
                } else {
                    Some(encode_packet(MessageType::Response, &0i32.to_le_bytes()))
                }
            }
            MessageType::RequestModelDef => Some(encode_packet(MessageType::ModelDef, &[])),
            MessageType::RequestFrameOfData => {
                frame_number = frame_number.wrapping_add(1);
                Some(encode_packet(
                    MessageType::FrameOfData,
                    &frame_payload(frame_number, args.frame_size),
                ))
            }
            other => {
                debug!("무시: {:?} from {}", other, peer);
                None
            }
        };

        match reply {
            Some(Ok(reply)) => {
                if let Err(e) = socket.send_to(&reply, peer).await {
                    warn!("응답 전송 실패 ({}): {}", peer, e);
                }
            }
            Some(Err(e)) => warn!("응답 인코딩 실패: {}", e),
            None => {}
        }
    }
}

/// 가짜 프레임: 프레임 번호(u32 LE) + 0 패딩
fn frame_payload(frame_number: u32, frame_size: usize) -> Vec<u8> {
    let mut payload = vec![0u8; frame_size.max(4)];
    payload[..4].copy_from_slice(&frame_number.to_le_bytes());
    payload
}

async fn stream_frames(socket: Arc<UdpSocket>, peer: SocketAddr, rate: f64, frame_size: usize) {
    info!("Streaming frames to {}", peer);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / rate));
    let mut frame_number = 0u32;

    loop {
        ticker.tick().await;
        frame_number = frame_number.wrapping_add(1);

        let packet = match encode_packet(
            MessageType::FrameOfData,
            &frame_payload(frame_number, frame_size),
        ) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("프레임 인코딩 실패: {}", e);
                break;
            }
        };
        if let Err(e) = socket.send_to(&packet, peer).await {
            warn!("프레임 전송 실패 ({}): {}", peer, e);
            break;
        }

        if frame_number % 1000 == 0 {
            info!("Progress: {} frames sent", frame_number);
        }
    }
}
