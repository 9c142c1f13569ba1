//! 연결 설정
//!
//! 연결 전에 한 번 만들어 클라이언트에 넘기는 불변 값

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, DEFAULT_COMMAND_PORT, DEFAULT_DATA_PORT, DEFAULT_MULTICAST_GROUP};

/// NatNet 연결 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 서버 주소
    pub server_address: Ipv4Addr,

    /// 로컬 인터페이스 주소
    pub local_address: Ipv4Addr,

    /// 멀티캐스트 수신 여부 (false면 유니캐스트 + keep-alive)
    pub use_multicast: bool,

    /// 멀티캐스트 그룹 주소
    pub multicast_address: Ipv4Addr,

    /// 서버 명령 포트
    pub command_port: u16,

    /// 데이터 포트 (0이면 OS 할당)
    pub data_port: u16,

    /// 응답/메시지 버퍼 최대 크기
    /// None이면 제한 없음
    pub max_buffer_size: Option<usize>,

    /// `NatNetClient::open`에서 ServerInfo를 기다리는 시간
    pub connection_timeout: Option<Duration>,

    /// 수신 버퍼 크기 (바이트)
    pub recv_buffer_size: usize,

    /// 소켓 수신 타임아웃
    /// 종료 신호 반응 시간의 상한이기도 함
    pub recv_timeout: Duration,

    /// keep-alive 전송 주기 (유니캐스트 전용)
    pub keep_alive_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST,
            local_address: Ipv4Addr::LOCALHOST,
            use_multicast: true,
            multicast_address: DEFAULT_MULTICAST_GROUP,
            command_port: DEFAULT_COMMAND_PORT,
            data_port: DEFAULT_DATA_PORT,
            max_buffer_size: None,
            connection_timeout: None,
            recv_buffer_size: 64 * 1024,            // 64KB
            recv_timeout: Duration::from_secs(3),
            keep_alive_interval: Duration::from_secs(3),
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 멀티캐스트 모드 기본 설정
    pub fn multicast() -> Self {
        Self::default()
    }

    /// 유니캐스트 모드 설정
    pub fn unicast(server_address: Ipv4Addr, local_address: Ipv4Addr) -> Self {
        Self {
            server_address,
            local_address,
            use_multicast: false,
            ..Self::default()
        }
    }

    /// JSON 파일에서 설정 로드
    /// 빠진 필드는 기본값 사용
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.use_multicast && !self.multicast_address.is_multicast() {
            return Err(Error::InvalidConfig(format!(
                "멀티캐스트 그룹 주소가 아님: {}",
                self.multicast_address
            )));
        }
        if self.command_port == 0 {
            return Err(Error::InvalidConfig("command_port는 0일 수 없음".into()));
        }
        if self.recv_buffer_size == 0 {
            return Err(Error::InvalidConfig("recv_buffer_size는 0일 수 없음".into()));
        }
        if self.recv_timeout.is_zero() {
            return Err(Error::InvalidConfig("recv_timeout은 0일 수 없음".into()));
        }
        if self.keep_alive_interval.is_zero() {
            return Err(Error::InvalidConfig("keep_alive_interval은 0일 수 없음".into()));
        }
        Ok(())
    }

    /// 서버 명령 채널 주소
    pub fn server_command_addr(&self) -> std::net::SocketAddr {
        (self.server_address, self.command_port).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.use_multicast);
        assert_eq!(config.command_port, 1510);
        assert_eq!(config.data_port, 1511);
        assert_eq!(config.multicast_address, Ipv4Addr::new(239, 255, 42, 99));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_multicast_group_rejected() {
        let config = Config {
            multicast_address: Ipv4Addr::new(10, 0, 0, 1),
            ..Config::multicast()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        // 유니캐스트에서는 그룹 주소를 보지 않음
        let config = Config {
            multicast_address: Ipv4Addr::new(10, 0, 0, 1),
            ..Config::unicast(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_command_port_rejected() {
        let config = Config {
            command_port: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "server_address": "192.168.0.10", "use_multicast": false, "max_buffer_size": 8 }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server_address, Ipv4Addr::new(192, 168, 0, 10));
        assert!(!config.use_multicast);
        assert_eq!(config.max_buffer_size, Some(8));
        assert_eq!(config.command_port, DEFAULT_COMMAND_PORT);
    }

    #[test]
    fn test_load_rejects_bad_address() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "server_address": "not-an-ip" }}"#).unwrap();

        assert!(matches!(Config::load(file.path()), Err(Error::Json(_))));
    }
}
