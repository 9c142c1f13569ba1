//! 백그라운드 실행 루프
//!
//! 전용 스레드 하나가 current-thread tokio 런타임을 돌린다.
//! - 명령 소켓 / 데이터 소켓 수신 태스크 (서로 블로킹하지 않음)
//! - 디스패처 태스크 (모든 상태 변경은 여기서만, 직렬로)
//! - keep-alive 태스크 (유니캐스트 전용)
//!
//! 모든 태스크는 하나의 종료 신호(watch)를 본다.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::message::KEEP_ALIVE_PACKET;
use crate::unpacker::Unpacker;
use crate::{Config, Error, Result};

/// 수신 태스크 → 디스패처 채널 크기
const DATAGRAM_QUEUE: usize = 1000;

/// 외부 스레드에서 루프로 보내는 명령
enum LoopCmd {
    /// 명령 소켓으로 서버에 전송
    Send {
        packet: Vec<u8>,
        reply: crossbeam_channel::Sender<io::Result<usize>>,
    },

    /// keep-alive 태스크 시작
    StartKeepAlive,
}

/// 연결 직후의 std 소켓 쌍
pub struct Sockets {
    pub command: std::net::UdpSocket,
    pub data: std::net::UdpSocket,
}

/// 루프로 요청을 보내는 핸들
#[derive(Clone)]
pub struct CommandSender {
    cmd_tx: mpsc::UnboundedSender<LoopCmd>,
}

impl CommandSender {
    /// 패킷 전송 후 완료될 때까지 호출 스레드를 블로킹
    pub fn send(&self, packet: Vec<u8>) -> Result<usize> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.cmd_tx
            .send(LoopCmd::Send {
                packet,
                reply: reply_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match reply_rx.recv() {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

/// 백그라운드 루프 소유 핸들
///
/// drop되면 루프를 멈추고 스레드가 끝날 때까지 기다린다.
pub struct LoopHandle {
    sender: CommandSender,
    stop_tx: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl LoopHandle {
    /// 루프 스레드 시작
    ///
    /// 수신 태스크는 즉시 돌기 시작함
    pub fn spawn<U: Unpacker>(
        config: Config,
        sockets: Sockets,
        dispatcher: Dispatcher<U>,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let thread = std::thread::Builder::new()
            .name("natnet-io".into())
            .spawn(move || run(config, sockets, dispatcher, cmd_rx, stop_rx))?;

        Ok(Self {
            sender: CommandSender { cmd_tx },
            stop_tx,
            thread: Some(thread),
        })
    }

    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// 블로킹 전송
    pub fn send(&self, packet: Vec<u8>) -> Result<usize> {
        self.sender.send(packet)
    }

    pub fn start_keep_alive(&self) -> Result<()> {
        self.sender
            .cmd_tx
            .send(LoopCmd::StartKeepAlive)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// 종료 신호 후 스레드 join
    pub fn stop(&mut self) {
        self.stop_tx.send_replace(true);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("백그라운드 스레드 패닉");
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 스레드 본체
///
/// 런타임이 drop될 때 남은 태스크가 취소되고 소켓이 닫힌다.
fn run<U: Unpacker>(
    config: Config,
    sockets: Sockets,
    dispatcher: Dispatcher<U>,
    cmd_rx: mpsc::UnboundedReceiver<LoopCmd>,
    stop_rx: watch::Receiver<bool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("런타임 생성 실패: {}", e);
            return;
        }
    };

    runtime.block_on(async move {
        if let Err(e) = event_loop(config, sockets, dispatcher, cmd_rx, stop_rx).await {
            error!("백그라운드 루프 에러: {}", e);
        }
    });

    debug!("백그라운드 스레드 종료");
}

async fn event_loop<U: Unpacker>(
    config: Config,
    sockets: Sockets,
    mut dispatcher: Dispatcher<U>,
    mut cmd_rx: mpsc::UnboundedReceiver<LoopCmd>,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<()> {
    let command = Arc::new(UdpSocket::from_std(sockets.command)?);
    let data = Arc::new(UdpSocket::from_std(sockets.data)?);
    let server_addr = config.server_command_addr();

    let (datagram_tx, mut datagram_rx) = mpsc::channel::<Bytes>(DATAGRAM_QUEUE);

    tokio::spawn(recv_loop(
        "command",
        command.clone(),
        datagram_tx.clone(),
        stop_rx.clone(),
        config.recv_buffer_size,
        config.recv_timeout,
    ));
    tokio::spawn(recv_loop(
        "data",
        data,
        datagram_tx,
        stop_rx.clone(),
        config.recv_buffer_size,
        config.recv_timeout,
    ));

    info!("백그라운드 루프 시작, 서버: {}", server_addr);

    loop {
        tokio::select! {
            biased;

            _ = stop_rx.changed() => break,

            Some(datagram) = datagram_rx.recv() => {
                dispatcher.dispatch(&datagram);
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(LoopCmd::Send { packet, reply }) => {
                    let result = command.send_to(&packet, server_addr).await;
                    if let Err(e) = &result {
                        warn!("전송 실패 ({}): {}", server_addr, e);
                    }
                    let _ = reply.send(result);
                }
                Some(LoopCmd::StartKeepAlive) => {
                    tokio::spawn(keep_alive_loop(
                        command.clone(),
                        server_addr,
                        config.keep_alive_interval,
                        stop_rx.clone(),
                    ));
                }
                None => break,
            },
        }
    }

    info!("백그라운드 루프 종료");
    Ok(())
}

/// 소켓 수신 루프
///
/// 타임아웃은 에러가 아님, 종료 신호가 올 때까지 재시도
async fn recv_loop(
    channel: &'static str,
    socket: Arc<UdpSocket>,
    datagram_tx: mpsc::Sender<Bytes>,
    mut stop_rx: watch::Receiver<bool>,
    buffer_size: usize,
    recv_timeout: Duration,
) {
    info!("{} 수신 태스크 시작", channel);
    let mut buf = vec![0u8; buffer_size];

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            result = tokio::time::timeout(recv_timeout, socket.recv_from(&mut buf)) => {
                match result {
                    Ok(Ok((0, _))) => {}
                    Ok(Ok((len, _addr))) => {
                        let datagram = Bytes::copy_from_slice(&buf[..len]);
                        if datagram_tx.send(datagram).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("{} 수신 에러: {}", channel, e);
                    }
                    Err(_) => {
                        // 타임아웃, 계속
                        debug!("{} 소켓 타임아웃", channel);
                    }
                }
            }
        }
    }

    debug!("{} 수신 태스크 종료", channel);
}

/// keep-alive 전송 루프 (첫 전송은 즉시)
async fn keep_alive_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("keep-alive 시작: {}, 주기 {:?}", server_addr, interval);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            _ = ticker.tick() => {
                if let Err(e) = socket.send_to(&KEEP_ALIVE_PACKET, server_addr).await {
                    warn!("keep-alive 전송 실패: {}", e);
                }
            }
        }
    }

    debug!("keep-alive 종료");
}
