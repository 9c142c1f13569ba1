//! 서버 응답/메시지 버퍼

use std::collections::VecDeque;

/// 크기 제한 FIFO 버퍼
///
/// 가득 차면 가장 오래된 항목부터 버림
#[derive(Debug, Clone)]
pub struct BoundedBuffer<T> {
    items: VecDeque<T>,

    /// None이면 제한 없음
    capacity: Option<usize>,
}

impl<T: Clone> BoundedBuffer<T> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.unwrap_or(16).min(1024)),
            capacity,
        }
    }

    /// 항목 추가
    pub fn push(&mut self, item: T) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.items.len() >= capacity {
                self.items.pop_front();
            }
        }
        self.items.push_back(item);
    }

    /// 도착 순서대로 복사본 반환
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
