//! 와이어 메시지 정의
//!
//! 모든 데이터그램 공통 헤더:
//! ```text
//! [message_id:2][payload_size:2][payload:N]
//! ```
//! little-endian, id는 signed / 크기는 unsigned.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, CLIENT_VERSION};

/// 헤더 크기 (바이트)
pub const HEADER_SIZE: usize = 4;

/// CONNECT 페이로드의 "Ping" 필드 크기
pub const CONNECT_PING_FIELD: usize = 265;

/// SERVER_INFO의 애플리케이션 이름 필드 크기
pub const APP_NAME_FIELD: usize = 256;

/// SERVER_INFO 페이로드 최소 크기 (이름 + 버전 4 + 프로토콜 버전 4)
pub const SERVER_INFO_SIZE: usize = APP_NAME_FIELD + 8;

/// 응답 문자열 최대 길이
pub const MAX_RESPONSE_STRING: usize = 30;

/// 헤더 크기 필드로 표현 가능한 최대 페이로드
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// keep-alive 데이터그램 (KEEP_ALIVE, size 0, NUL)
pub const KEEP_ALIVE_PACKET: [u8; 5] = [0x0A, 0x00, 0x00, 0x00, 0x00];

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// 연결 요청
    Connect,

    /// 서버 정보
    ServerInfo,

    /// 문자열 명령
    Request,

    /// 명령 응답
    Response,

    /// 모델 정의 요청
    RequestModelDef,

    /// 모델 정의
    ModelDef,

    /// 프레임 요청
    RequestFrameOfData,

    /// 프레임 데이터
    FrameOfData,

    /// 서버 자유 메시지
    MessageString,

    /// 유니캐스트 생존 신호
    KeepAlive,

    /// 서버가 이해하지 못한 요청
    UnrecognizedRequest,

    /// 알 수 없는 id (원래 값 보존)
    Undefined(i16),
}

impl MessageType {
    /// id에서 변환
    /// 알 수 없는 id는 실패가 아니라 `Undefined`
    pub fn from_id(id: i16) -> Self {
        match id {
            0 => MessageType::Connect,
            1 => MessageType::ServerInfo,
            2 => MessageType::Request,
            3 => MessageType::Response,
            4 => MessageType::RequestModelDef,
            5 => MessageType::ModelDef,
            6 => MessageType::RequestFrameOfData,
            7 => MessageType::FrameOfData,
            8 => MessageType::MessageString,
            10 => MessageType::KeepAlive,
            100 => MessageType::UnrecognizedRequest,
            other => MessageType::Undefined(other),
        }
    }

    /// 가변 길이 페이로드 여부
    ///
    /// 프레임/모델 정의는 크기 필드를 넘어서는 길이로 올 수 있어서
    /// 선언 크기보다 데이터가 짧으면 남은 전체를 페이로드로 본다.
    pub fn has_variable_payload(self) -> bool {
        matches!(self, MessageType::FrameOfData | MessageType::ModelDef)
    }

    /// 와이어 id
    pub fn id(self) -> i16 {
        match self {
            MessageType::Connect => 0,
            MessageType::ServerInfo => 1,
            MessageType::Request => 2,
            MessageType::Response => 3,
            MessageType::RequestModelDef => 4,
            MessageType::ModelDef => 5,
            MessageType::RequestFrameOfData => 6,
            MessageType::FrameOfData => 7,
            MessageType::MessageString => 8,
            MessageType::KeepAlive => 10,
            MessageType::UnrecognizedRequest => 100,
            MessageType::Undefined(id) => id,
        }
    }
}

/// 메시지 헤더
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// 메시지 타입
    pub msg_type: MessageType,

    /// 페이로드 크기 (헤더 제외, 부호 없는 16비트)
    pub payload_size: u16,
}

impl MessageHeader {
    pub fn new(msg_type: MessageType, payload_size: u16) -> Self {
        Self {
            msg_type,
            payload_size,
        }
    }

    /// 헤더 바이트
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let id = self.msg_type.id().to_le_bytes();
        let size = self.payload_size.to_le_bytes();
        [id[0], id[1], size[0], size[1]]
    }

    /// 데이터그램 앞부분에서 헤더를 읽고 페이로드 슬라이스를 반환
    ///
    /// 페이로드는 `payload_size`만큼 잘라서 넘김.
    /// 선언 크기가 실제 데이터보다 크면 FRAME_OF_DATA / MODEL_DEF는 남은 전체,
    /// 나머지 타입은 잘못된 헤더.
    pub fn decode(datagram: &[u8]) -> Result<(Self, &[u8])> {
        if datagram.len() < HEADER_SIZE {
            return Err(Error::Truncated {
                needed: HEADER_SIZE,
                got: datagram.len(),
            });
        }

        let id = i16::from_le_bytes([datagram[0], datagram[1]]);
        let payload_size = u16::from_le_bytes([datagram[2], datagram[3]]);
        let msg_type = MessageType::from_id(id);
        let rest = &datagram[HEADER_SIZE..];

        let payload = if payload_size as usize <= rest.len() {
            &rest[..payload_size as usize]
        } else if msg_type.has_variable_payload() {
            rest
        } else {
            return Err(Error::MalformedHeader {
                declared: payload_size,
                available: rest.len(),
            });
        };

        Ok((Self::new(msg_type, payload_size), payload))
    }
}

/// 클라이언트 요청 인코딩
///
/// 헤더 + 페이로드 + NUL. payload_size는 NUL을 포함한 길이.
/// - KEEP_ALIVE / REQUEST_MODEL_DEF / REQUEST_FRAME_OF_DATA: 본문 무시
/// - REQUEST: 본문 문자열 그대로
/// - CONNECT: 265바이트 "Ping" 필드 + 클라이언트 버전 4바이트 + NUL
pub fn encode_request(msg_type: MessageType, body: &str) -> Result<Vec<u8>> {
    let payload: Vec<u8> = match msg_type {
        MessageType::Undefined(_) => return Err(Error::UndefinedRequest),
        MessageType::KeepAlive
        | MessageType::RequestModelDef
        | MessageType::RequestFrameOfData => Vec::new(),
        MessageType::Connect => connect_payload(),
        _ => body.as_bytes().to_vec(),
    };

    let payload_size = u16::try_from(payload.len() + 1).map_err(|_| Error::PayloadTooLarge {
        len: payload.len() + 1,
        max: MAX_PAYLOAD_SIZE,
    })?;

    let header = MessageHeader::new(msg_type, payload_size);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + 1);
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(&payload);
    buf.push(0);
    Ok(buf)
}

/// CONNECT 페이로드 (서버 호환을 위해 형식 고정)
fn connect_payload() -> Vec<u8> {
    let mut payload = vec![0u8; CONNECT_PING_FIELD];
    payload[..4].copy_from_slice(b"Ping");
    payload.extend_from_slice(&CLIENT_VERSION);
    payload.push(0);
    payload
}

/// 서버측 패킷 인코딩 (payload_size = 페이로드 길이 그대로)
///
/// 크기 필드에 담을 수 없는 페이로드는 자르지 않고 거부
pub fn encode_packet(msg_type: MessageType, payload: &[u8]) -> Result<Vec<u8>> {
    let payload_size = u16::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge {
        len: payload.len(),
        max: MAX_PAYLOAD_SIZE,
    })?;
    let header = MessageHeader::new(msg_type, payload_size);

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// NUL 종료 문자열 읽기 (NUL이 없으면 전체)
pub fn read_cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// 서버 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// 서버 애플리케이션 이름
    pub application_name: String,

    /// 서버 애플리케이션 버전
    pub version: [u8; 4],

    /// NatNet 비트스트림 major
    pub nat_net_major: u8,

    /// NatNet 비트스트림 minor
    pub nat_net_minor: u8,
}

impl ServerInfo {
    /// SERVER_INFO 페이로드 파싱
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < SERVER_INFO_SIZE {
            return Err(Error::Truncated {
                needed: SERVER_INFO_SIZE,
                got: payload.len(),
            });
        }

        let application_name = read_cstr(&payload[..APP_NAME_FIELD]);
        let v = &payload[APP_NAME_FIELD..APP_NAME_FIELD + 4];
        let nn = &payload[APP_NAME_FIELD + 4..SERVER_INFO_SIZE];

        Ok(Self {
            application_name,
            version: [v[0], v[1], v[2], v[3]],
            nat_net_major: nn[0],
            nat_net_minor: nn[1],
        })
    }

    /// SERVER_INFO 페이로드 생성 (서버/테스트용)
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = vec![0u8; SERVER_INFO_SIZE];
        let name = self.application_name.as_bytes();
        let len = name.len().min(APP_NAME_FIELD - 1);
        payload[..len].copy_from_slice(&name[..len]);
        payload[APP_NAME_FIELD..APP_NAME_FIELD + 4].copy_from_slice(&self.version);
        payload[APP_NAME_FIELD + 4] = self.nat_net_major;
        payload[APP_NAME_FIELD + 5] = self.nat_net_minor;
        payload
    }
}

/// 명령 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// 4바이트 정수 응답
    Int(i32),

    /// 짧은 문자열 응답
    Text(String),
}

impl Response {
    /// RESPONSE 페이로드 파싱
    ///
    /// 정확히 4바이트면 정수, 아니면 NUL 종료 문자열.
    /// 30바이트를 넘는 문자열은 None.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() == 4 {
            let value = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            return Some(Response::Int(value));
        }

        let text = read_cstr(&payload[..payload.len().min(256)]);
        if text.len() > MAX_RESPONSE_STRING {
            return None;
        }
        Some(Response::Text(text))
    }

    /// "Bitstream,<major>.<minor>" 응답이면 버전 반환
    pub fn bitstream_version(&self) -> Option<(u8, u8)> {
        let Response::Text(text) = self else {
            return None;
        };

        let mut parts = text.split(',');
        if parts.next()? != "Bitstream" {
            return None;
        }
        let mut version = parts.next()?.split('.');
        let major = version.next()?.trim().parse().ok()?;
        let minor = version.next()?.trim().parse().ok()?;
        Some((major, minor))
    }
}
