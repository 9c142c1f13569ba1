//! 수신 메시지 분배
//!
//! 헤더를 읽고 메시지 타입별 핸들러 하나를 실행한다.
//! 백그라운드 루프의 단일 태스크에서만 돌기 때문에
//! 디코더 선택과 프레임 디코딩이 서로 끼어들 수 없다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::buffer::BoundedBuffer;
use crate::frames::FrameSlot;
use crate::message::{read_cstr, MessageHeader, MessageType, Response, ServerInfo};
use crate::unpacker::{DecoderVersion, Unpacker};
use crate::Result;

/// 백그라운드 루프와 외부 호출자가 공유하는 상태
///
/// 쓰기는 디스패처만, 읽기는 누구나 (항상 복사본/Arc로 읽음)
pub struct Shared<F, D> {
    pub(crate) server_info: RwLock<Option<ServerInfo>>,
    pub(crate) descriptors: RwLock<Option<Arc<D>>>,
    pub(crate) last_frame_time: RwLock<Option<SystemTime>>,
    pub(crate) responses: Mutex<BoundedBuffer<Response>>,
    pub(crate) messages: Mutex<BoundedBuffer<String>>,
    pub(crate) frames: Arc<FrameSlot<F>>,
    pub(crate) can_change_bitstream: AtomicBool,
}

impl<F, D> Shared<F, D> {
    pub fn new(max_buffer_size: Option<usize>) -> Self {
        Self {
            server_info: RwLock::new(None),
            descriptors: RwLock::new(None),
            last_frame_time: RwLock::new(None),
            responses: Mutex::new(BoundedBuffer::new(max_buffer_size)),
            messages: Mutex::new(BoundedBuffer::new(max_buffer_size)),
            frames: Arc::new(FrameSlot::new()),
            can_change_bitstream: AtomicBool::new(false),
        }
    }

    /// 연결 종료 시 세션 상태 정리
    ///
    /// 대기 중인 프레임 소비자도 모두 깨움
    pub fn reset_session(&self) {
        *self.server_info.write() = None;
        self.can_change_bitstream.store(false, Ordering::SeqCst);
        self.frames.close();
    }
}

/// 메시지 디스패처
pub struct Dispatcher<U: Unpacker> {
    unpacker: U,
    decoder: DecoderVersion,
    shared: Arc<Shared<U::Frame, U::Descriptors>>,
    use_multicast: bool,
    server_ready: Sender<()>,
}

impl<U: Unpacker> Dispatcher<U> {
    pub fn new(
        unpacker: U,
        shared: Arc<Shared<U::Frame, U::Descriptors>>,
        use_multicast: bool,
        server_ready: Sender<()>,
    ) -> Self {
        Self {
            unpacker,
            decoder: DecoderVersion::default(),
            shared,
            use_multicast,
            server_ready,
        }
    }

    /// 현재 선택된 디코더
    pub fn decoder(&self) -> DecoderVersion {
        self.decoder
    }

    /// 데이터그램 하나 처리
    ///
    /// 잘못된 데이터그램은 로그만 남기고 버림
    pub fn dispatch(&mut self, datagram: &[u8]) {
        if let Err(e) = self.try_dispatch(datagram) {
            warn!("데이터그램 버림: {}", e);
        }
    }

    fn try_dispatch(&mut self, datagram: &[u8]) -> Result<()> {
        let (header, payload) = MessageHeader::decode(datagram)?;

        match header.msg_type {
            MessageType::ServerInfo => self.handle_server_info(payload)?,
            MessageType::FrameOfData => self.handle_frame(payload)?,
            MessageType::ModelDef => self.handle_model_def(payload)?,
            MessageType::Response => self.handle_response(payload),
            MessageType::MessageString => self.handle_message(payload),
            MessageType::UnrecognizedRequest => {
                debug!("UNRECOGNIZED_REQUEST - payload_size: {}", header.payload_size);
            }
            other => {
                debug!(
                    "처리하지 않는 메시지 {:?} (id={}) - payload_size: {}",
                    other,
                    other.id(),
                    header.payload_size
                );
            }
        }

        Ok(())
    }

    fn handle_server_info(&mut self, payload: &[u8]) -> Result<()> {
        let info = ServerInfo::parse(payload)?;
        info!(
            "서버 정보 수신: {} v{:?}, NatNet {}.{}",
            info.application_name, info.version, info.nat_net_major, info.nat_net_minor
        );

        let can_change = info.nat_net_major >= 4 && !self.use_multicast;
        self.shared
            .can_change_bitstream
            .store(can_change, Ordering::SeqCst);

        self.update_server_info(info);

        // connect() 대기 해제 (이미 신호가 차 있으면 무시)
        let _ = self.server_ready.try_send(());
        Ok(())
    }

    fn handle_frame(&mut self, payload: &[u8]) -> Result<()> {
        *self.shared.last_frame_time.write() = Some(SystemTime::now());
        let frame = self.unpacker.unpack_frame(self.decoder, payload)?;
        self.shared.frames.publish(frame);
        Ok(())
    }

    fn handle_model_def(&mut self, payload: &[u8]) -> Result<()> {
        let descriptors = self.unpacker.unpack_descriptors(self.decoder, payload)?;
        *self.shared.descriptors.write() = Some(Arc::new(descriptors));
        debug!("모델 정의 갱신: {} bytes", payload.len());
        Ok(())
    }

    fn handle_response(&mut self, payload: &[u8]) {
        let Some(response) = Response::parse(payload) else {
            warn!("응답 문자열이 너무 김: {} bytes", payload.len());
            return;
        };

        if let Some((major, minor)) = response.bitstream_version() {
            let current = self.shared.server_info.read().clone();
            match current {
                Some(info) => {
                    info!("비트스트림 변경: NatNet {}.{}", major, minor);
                    self.update_server_info(ServerInfo {
                        nat_net_major: major,
                        nat_net_minor: minor,
                        ..info
                    });
                }
                None => warn!("서버 정보 없이 비트스트림 응답 수신: {}.{}", major, minor),
            }
        }

        self.shared.responses.lock().push(response);
    }

    fn handle_message(&mut self, payload: &[u8]) {
        let message = read_cstr(payload);
        debug!("서버 메시지: {}", message);
        self.shared.messages.lock().push(message);
    }

    /// 서버 정보 저장 후 디코더 재선택
    fn update_server_info(&mut self, info: ServerInfo) {
        let decoder = DecoderVersion::select(info.nat_net_major, info.nat_net_minor);
        if decoder != self.decoder {
            debug!("디코더 변경: {:?} -> {:?}", self.decoder, decoder);
        }
        self.decoder = decoder;
        *self.shared.server_info.write() = Some(info);
    }
}
