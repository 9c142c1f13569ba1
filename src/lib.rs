//! # NatNet 클라이언트
//!
//! 모션 캡처 서버(NatNet)의 UDP 스트림을 받는 클라이언트
//!
//! ## 핵심 특징
//! - **두 채널**: 명령 채널(요청/응답) + 데이터 채널(프레임 스트림)
//! - **멀티캐스트/유니캐스트**: 유니캐스트는 keep-alive 자동 전송
//! - **백그라운드 루프**: 전용 스레드에서 수신/디스패치, 호출자는 블로킹 없음
//! - **최신 프레임만**: 소비자가 느리면 중간 프레임은 건너뜀
//! - **디코더 교체 가능**: `Unpacker` 구현으로 프레임 타입 지정

mod background;
pub mod buffer;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frames;
pub mod message;
pub mod unpacker;

use std::net::Ipv4Addr;

pub use client::{ConnectionState, NatNetClient};
pub use config::Config;
pub use error::{Error, Result};
pub use frames::{FrameStream, Frames};
pub use message::{MessageHeader, MessageType, Response, ServerInfo};
pub use unpacker::{DecoderVersion, RawDescriptors, RawFrame, RawUnpacker, Unpacker};

/// 이 클라이언트가 CONNECT에 싣는 NatNet 버전
pub const CLIENT_VERSION: [u8; 4] = [4, 1, 0, 0];

/// 기본 명령 포트
pub const DEFAULT_COMMAND_PORT: u16 = 1510;

/// 기본 데이터 포트
pub const DEFAULT_DATA_PORT: u16 = 1511;

/// 기본 멀티캐스트 그룹
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 42, 99);
