//! NatNet 클라이언트 CLI
//!
//! 서버에 연결해 서버 정보와 모델 정의를 출력하고 프레임을 받는다.
//!
//! 사용법:
//!   cargo run --release --bin natnet-client -- [OPTIONS]
//!
//! 예시:
//!   # 멀티캐스트 (기본)
//!   cargo run --release --bin natnet-client -- --server 192.168.0.10 --local 192.168.0.20
//!
//!   # 유니캐스트, 프레임 100개 후 종료
//!   cargo run --release --bin natnet-client -- -s 127.0.0.1 -l 127.0.0.1 --unicast --frames 100

use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use natnet::{Config, MessageType, NatNetClient, RawFrame};

/// CLI 설정
struct ClientArgs {
    /// 연결 + 프레임 대기 타임아웃
    timeout: Duration,

    /// 받을 프레임 수 (None이면 타임아웃까지)
    frames: Option<usize>,

    /// async 스트림으로 수신
    use_async: bool,

    config: Config,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            frames: None,
            use_async: false,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config.config = Config::load(&args[i + 1]).expect("설정 파일 로드 실패");
                    i += 1;
                }
            }
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    config.config.server_address = args[i + 1].parse().expect("유효한 IPv4 주소 필요");
                    i += 1;
                }
            }
            "--local" | "-l" => {
                if i + 1 < args.len() {
                    config.config.local_address = args[i + 1].parse().expect("유효한 IPv4 주소 필요");
                    i += 1;
                }
            }
            "--multicast" | "-m" => {
                config.config.use_multicast = true;
            }
            "--unicast" | "-u" => {
                config.config.use_multicast = false;
            }
            "--group" | "-g" => {
                if i + 1 < args.len() {
                    config.config.multicast_address = args[i + 1].parse().expect("유효한 IPv4 주소 필요");
                    i += 1;
                }
            }
            "--command-port" => {
                if i + 1 < args.len() {
                    config.config.command_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--data-port" => {
                if i + 1 < args.len() {
                    config.config.data_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--timeout" | "-t" => {
                if i + 1 < args.len() {
                    let secs: f64 = args[i + 1].parse().expect("유효한 숫자 필요");
                    config.timeout = Duration::from_secs_f64(secs);
                    i += 1;
                }
            }
            "--frames" | "-n" => {
                if i + 1 < args.len() {
                    config.frames = Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--async" => {
                config.use_async = true;
            }
            "--help" | "-h" => {
                println!(
                    r#"NatNet Client - 모션 캡처 스트림 수신 클라이언트

사용법:
  cargo run --release --bin natnet-client -- [OPTIONS]

옵션:
  -c, --config <PATH>      JSON 설정 파일 (다른 옵션보다 먼저 지정)
  -s, --server <IP>        서버 주소 (기본: 127.0.0.1)
  -l, --local <IP>         로컬 인터페이스 주소 (기본: 127.0.0.1)
  -m, --multicast          멀티캐스트 수신 (기본)
  -u, --unicast            유니캐스트 수신 + keep-alive
  -g, --group <IP>         멀티캐스트 그룹 (기본: 239.255.42.99)
  --command-port <PORT>    명령 포트 (기본: 1510)
  --data-port <PORT>       데이터 포트 (기본: 1511)
  -t, --timeout <SECS>     연결/프레임 대기 타임아웃 (기본: 5)
  -n, --frames <N>         N개 프레임 후 종료 (기본: 타임아웃까지)
  --async                  async 스트림으로 수신
  -h, --help               이 도움말 출력

예시:
  # 로컬 mock 서버에 유니캐스트로 연결
  cargo run --release --bin natnet-client -- --unicast --data-port 0 --frames 10
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

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정 (RUST_LOG로 조정 가능)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();

    info!("NatNet Client starting...");
    info!("Server address: {}", args.config.server_command_addr());
    info!(
        "Mode: {}",
        if args.config.use_multicast {
            "multicast"
        } else {
            "unicast"
        }
    );

    let client = NatNetClient::new(args.config.clone());
    if !client.connect(Some(args.timeout))? {
        warn!("서버에 연결하지 못함");
        return Ok(());
    }

    if let Some(info) = client.server_info() {
        println!("Server: {}", info.application_name);
        println!(
            "  Version: {}.{}.{}.{}",
            info.version[0], info.version[1], info.version[2], info.version[3]
        );
        println!("  NatNet: {}.{}", info.nat_net_major, info.nat_net_minor);
        println!("  Bitstream changeable: {}", client.can_change_bitstream());
    }

    client.send_request(MessageType::RequestModelDef, "")?;

    let start = Instant::now();
    let received = if args.use_async {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(receive_async(&client, &args))?
    } else {
        receive_blocking(&client, &args)
    };

    match client.descriptors() {
        Some(descriptors) => println!("Model definitions: {} bytes", descriptors.payload.len()),
        None => println!("Model definitions: none"),
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!("\n═══════════════════════════════════════");
    println!("  Frames received: {}", received);
    println!("  Elapsed:         {:.2}s", elapsed);
    if elapsed > 0.0 {
        println!("  Rate:            {:.1} fps", received as f64 / elapsed);
    }
    println!("  Responses:       {}", client.responses().len());
    println!("  Messages:        {}", client.messages().len());
    println!("═══════════════════════════════════════");

    client.shutdown()?;
    Ok(())
}

fn print_frame(index: usize, frame: &RawFrame) {
    println!(
        "frame #{:<6} decoder={:?} {} bytes",
        index,
        frame.version,
        frame.payload.len()
    );
}

fn receive_blocking(client: &NatNetClient, args: &ClientArgs) -> usize {
    let mut received = 0;
    for frame in client.frames(Some(args.timeout)) {
        received += 1;
        print_frame(received, &frame);
        if args.frames.is_some_and(|limit| received >= limit) {
            break;
        }
    }
    received
}

async fn receive_async(client: &NatNetClient, args: &ClientArgs) -> natnet::Result<usize> {
    let mut stream = client.frame_stream(Some(args.timeout))?;
    let mut received = 0;
    while let Some(frame) = stream.next().await {
        received += 1;
        print_frame(received, &frame);
        if args.frames.is_some_and(|limit| received >= limit) {
            break;
        }
    }
    Ok(received)
}
