//! 프레임 소비 인터페이스
//!
//! 최신 프레임 하나만 담는 슬롯과 두 가지 소비 방식:
//! - `Frames`: 스레드를 블로킹하는 Iterator (여러 개 동시 사용 가능)
//! - `FrameStream`: async 태스크용, 동시에 하나만 허용
//!
//! 어느 쪽이든 생성 이후에 도착한 프레임만 내보내고,
//! 소비가 늦으면 중간 프레임은 건너뛴다 (버퍼링 없음).

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::watch;

use crate::{Error, Result};

/// async 소비자에게 보내는 신호
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signal {
    /// 프레임 도착 순번
    seq: u64,

    /// 슬롯이 닫힌 횟수 (연결 종료마다 증가)
    closes: u64,
}

struct SlotState<F> {
    seq: u64,
    closes: u64,
    frame: Option<Arc<F>>,
}

/// 최신 프레임 슬롯
pub struct FrameSlot<F> {
    state: Mutex<SlotState<F>>,
    arrived: Condvar,
    signal: watch::Sender<Signal>,
    async_active: AtomicBool,
}

impl<F> FrameSlot<F> {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(Signal { seq: 0, closes: 0 });
        Self {
            state: Mutex::new(SlotState {
                seq: 0,
                closes: 0,
                frame: None,
            }),
            arrived: Condvar::new(),
            signal,
            async_active: AtomicBool::new(false),
        }
    }

    /// 새 프레임 게시 후 모든 대기자 깨움
    pub fn publish(&self, frame: F) {
        let signal = {
            let mut state = self.state.lock();
            state.seq += 1;
            state.frame = Some(Arc::new(frame));
            Signal {
                seq: state.seq,
                closes: state.closes,
            }
        };
        self.arrived.notify_all();
        self.signal.send_replace(signal);
    }

    /// 대기 중인 소비자를 모두 종료시킴
    pub fn close(&self) {
        let signal = {
            let mut state = self.state.lock();
            state.closes += 1;
            Signal {
                seq: state.seq,
                closes: state.closes,
            }
        };
        self.arrived.notify_all();
        self.signal.send_replace(signal);
    }

    /// 현재 프레임
    pub fn latest(&self) -> Option<Arc<F>> {
        self.state.lock().frame.clone()
    }

    /// 지금까지 게시된 프레임 수
    pub fn sequence(&self) -> u64 {
        self.state.lock().seq
    }
}

impl<F> Default for FrameSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// 블로킹 프레임 Iterator
///
/// 각 단계에서 새 프레임이 올 때까지 스레드를 멈춘다.
/// `timeout` 동안 아무것도 안 오거나 연결이 끊기면 끝.
pub struct Frames<F> {
    slot: Arc<FrameSlot<F>>,
    timeout: Option<Duration>,
    seen: u64,
    closes: u64,
    done: bool,
}

impl<F> Frames<F> {
    pub fn new(slot: Arc<FrameSlot<F>>, timeout: Option<Duration>) -> Self {
        let (seen, closes) = {
            let state = slot.state.lock();
            (state.seq, state.closes)
        };
        Self {
            slot,
            timeout,
            seen,
            closes,
            done: false,
        }
    }

    fn take_fresh(&mut self, state: &SlotState<F>) -> Option<Option<Arc<F>>> {
        if state.closes != self.closes {
            return Some(None);
        }
        if state.seq > self.seen {
            self.seen = state.seq;
            return Some(state.frame.clone());
        }
        None
    }
}

impl<F> Iterator for Frames<F> {
    type Item = Arc<F>;

    fn next(&mut self) -> Option<Arc<F>> {
        if self.done {
            return None;
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let slot = self.slot.clone();
        let mut state = slot.state.lock();

        let item = loop {
            if let Some(item) = self.take_fresh(&state) {
                break item;
            }
            match deadline {
                Some(deadline) => {
                    if slot.arrived.wait_until(&mut state, deadline).timed_out() {
                        break self.take_fresh(&state).flatten();
                    }
                }
                None => slot.arrived.wait(&mut state),
            }
        };

        if item.is_none() {
            self.done = true;
        }
        item
    }
}

impl<F> FusedIterator for Frames<F> {}

/// async 프레임 스트림
///
/// 클라이언트당 하나만 존재할 수 있음. drop되면 다시 만들 수 있다.
pub struct FrameStream<F> {
    slot: Arc<FrameSlot<F>>,
    rx: watch::Receiver<Signal>,
    timeout: Option<Duration>,
    seen: u64,
    closes: u64,
    done: bool,
}

impl<F> FrameStream<F> {
    /// 스트림 생성
    ///
    /// 다른 스트림이 살아 있으면 `Error::ConsumerBusy`
    pub fn new(slot: Arc<FrameSlot<F>>, timeout: Option<Duration>) -> Result<Self> {
        if slot
            .async_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ConsumerBusy);
        }

        let rx = slot.signal.subscribe();
        let Signal { seq, closes } = *rx.borrow();
        Ok(Self {
            slot,
            rx,
            timeout,
            seen: seq,
            closes,
            done: false,
        })
    }

    /// 다음 프레임
    ///
    /// 타임아웃이나 연결 종료 시 None, 이후로도 계속 None
    pub async fn next(&mut self) -> Option<Arc<F>> {
        if self.done {
            return None;
        }

        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let item = loop {
            let signal = *self.rx.borrow_and_update();
            if signal.closes != self.closes {
                break None;
            }
            if signal.seq > self.seen {
                self.seen = signal.seq;
                break self.slot.latest();
            }

            let changed = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.rx.changed()).await {
                        Ok(changed) => changed,
                        Err(_) => break None,
                    }
                }
                None => self.rx.changed().await,
            };
            if changed.is_err() {
                break None;
            }
        };

        if item.is_none() {
            self.done = true;
        }
        item
    }
}

impl<F> Drop for FrameStream<F> {
    fn drop(&mut self) {
        self.slot.async_active.store(false, Ordering::Release);
    }
}
