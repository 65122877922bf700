//! Bounded FIFO of parsed commands with replay support.
//!
//! [`CommandQueue`] is a fixed ring of `N` slots. Besides the usual push /
//! pop / peek it supports:
//!
//! - [`rewind`](CommandQueue::rewind): move the read cursor backwards so that
//!   already-popped commands are served again (used by `M999` jumps);
//! - [`take`](CommandQueue::take): remove one command out of order (used to
//!   pull `M1` past blocked commands while in emergency stop).
//!
//! Popped commands stay in their slots until overwritten by a later push,
//! which is what makes replay possible. The queue tracks how many of those
//! retained slots are still intact and refuses to rewind over anything else.
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::queue::CommandQueue;
//! use rs_axisctl::commands::{Command, CommandKind};
//!
//! let mut queue: CommandQueue<4> = CommandQueue::new();
//! assert!(queue.push(Command::new(CommandKind::SetRelative)));
//! assert!(queue.push(Command::new(CommandKind::Home)));
//!
//! assert_eq!(queue.pop().unwrap().kind, CommandKind::SetRelative);
//! assert_eq!(queue.size(), 1);
//!
//! // Replay the command we just consumed.
//! assert!(queue.rewind(1));
//! assert_eq!(queue.peek(0).unwrap().kind, CommandKind::SetRelative);
//! assert_eq!(queue.size(), 2);
//! ```

use crate::commands::Command;

/// Default queue depth per serial channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Fixed-capacity command ring buffer.
///
/// Index arithmetic is done in the signed domain and wrapped with
/// `rem_euclid`, so moving the read cursor backwards past slot 0 cannot
/// underflow.
#[derive(Clone, Debug)]
pub struct CommandQueue<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    slots: [Command; N],
    read: usize,
    write: usize,
    size: usize,
    /// Popped commands directly behind `read` that are still intact.
    retained: usize,
}

impl<const N: usize> CommandQueue<N> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            slots: [Command::INVALID; N],
            read: 0,
            write: 0,
            size: 0,
            retained: 0,
        }
    }

    #[inline]
    fn wrap(index: isize) -> usize {
        index.rem_euclid(N as isize) as usize
    }

    #[inline]
    fn slot_index(&self, offset: usize) -> usize {
        Self::wrap(self.read as isize + offset as isize)
    }

    /// Append a command. Returns false, without enqueueing, when full.
    #[must_use]
    pub fn push(&mut self, command: Command) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.write] = command;
        self.write = Self::wrap(self.write as isize + 1);
        self.size += 1;
        // The slot just written may have held the oldest retained command.
        self.retained = self.retained.min(N - self.size);
        true
    }

    /// Remove and return the oldest command.
    pub fn pop(&mut self) -> Option<Command> {
        if self.size == 0 {
            return None;
        }
        let command = self.slots[self.read];
        self.read = Self::wrap(self.read as isize + 1);
        self.size -= 1;
        self.retained = (self.retained + 1).min(N - self.size);
        Some(command)
    }

    /// Look at the command `offset` places from the head without removing it.
    pub fn peek(&self, offset: usize) -> Option<&Command> {
        if offset >= self.size {
            return None;
        }
        Some(&self.slots[self.slot_index(offset)])
    }

    /// Mutable access to a pending command (used for jump countdowns).
    pub fn peek_mut(&mut self, offset: usize) -> Option<&mut Command> {
        if offset >= self.size {
            return None;
        }
        let index = self.slot_index(offset);
        Some(&mut self.slots[index])
    }

    /// Remove the command `offset` places from the head, closing the gap.
    ///
    /// Commands behind it keep their relative order. Retained history is
    /// discarded since the slots shift.
    pub fn take(&mut self, offset: usize) -> Option<Command> {
        if offset >= self.size {
            return None;
        }
        if offset == 0 {
            return self.pop();
        }
        let command = self.slots[self.slot_index(offset)];
        for i in offset..self.size - 1 {
            let dst = self.slot_index(i);
            let src = self.slot_index(i + 1);
            self.slots[dst] = self.slots[src];
        }
        self.write = Self::wrap(self.write as isize - 1);
        self.size -= 1;
        self.retained = 0;
        Some(command)
    }

    /// Move the read cursor back by `offset`, re-queueing that many
    /// previously popped commands.
    ///
    /// Fails without changing anything when the queue is empty, when
    /// `offset >= N`, or when the cursor would reach or pass the write
    /// cursor (which would serve slots that were never pushed or have
    /// already been overwritten).
    #[must_use]
    pub fn rewind(&mut self, offset: usize) -> bool {
        if self.size == 0 || offset >= N {
            return false;
        }
        let free = N - self.size;
        if offset > self.retained || offset >= free {
            return false;
        }
        self.read = Self::wrap(self.read as isize - offset as isize);
        self.size += offset;
        self.retained -= offset;
        log::trace!("queue rewound by {}, size now {}", offset, self.size);
        true
    }

    /// Position of the first pending command matching `predicate`.
    pub fn position<F>(&self, mut predicate: F) -> Option<usize>
    where
        F: FnMut(&Command) -> bool,
    {
        (0..self.size).find(|&i| predicate(&self.slots[self.slot_index(i)]))
    }

    /// Drop every pending command and the replay history.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.size = 0;
        self.retained = 0;
    }

    /// Number of pending commands.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alias of [`size`](Self::size).
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns true if a push would fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == N
    }

    /// Total number of slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
