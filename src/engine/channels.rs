//! Engine Channels
//!
//! Lock-free communication between the control thread and the render thread.
//! Uses rtrb ring buffers for SPSC (single-producer, single-consumer) queues:
//! commands flow to the render thread, events and retired allocations flow
//! back.

use rtrb::{Consumer, Producer, RingBuffer};

use super::commands::{EngineCommand, EngineEvent, Retired};

/// Default buffer size for command queue (control -> render).
pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 1024;

/// Default buffer size for event queue (render -> control).
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Holds all three queues before they are split between the two threads.
pub struct EngineChannels {
    command_tx: Producer<EngineCommand>,
    command_rx: Consumer<EngineCommand>,
    event_tx: Producer<EngineEvent>,
    event_rx: Consumer<EngineEvent>,
    retire_tx: Producer<Retired>,
    retire_rx: Consumer<Retired>,
}

impl EngineChannels {
    /// Create new engine channels with the specified buffer sizes.
    pub fn new(command_capacity: usize, event_capacity: usize, retire_capacity: usize) -> Self {
        let (command_tx, command_rx) = RingBuffer::new(command_capacity);
        let (event_tx, event_rx) = RingBuffer::new(event_capacity);
        let (retire_tx, retire_rx) = RingBuffer::new(retire_capacity);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            retire_tx,
            retire_rx,
        }
    }

    /// Split the channels into control-side and render-side handles.
    pub fn split(self) -> (ControlHandle, RenderHandle) {
        let control = ControlHandle {
            command_tx: self.command_tx,
            event_rx: self.event_rx,
            retire_rx: self.retire_rx,
        };
        let render = RenderHandle {
            command_rx: self.command_rx,
            event_tx: self.event_tx,
            retire_tx: self.retire_tx,
        };
        (control, render)
    }
}

/// Control-side handle: command producer, event and retire consumers.
pub struct ControlHandle {
    command_tx: Producer<EngineCommand>,
    event_rx: Consumer<EngineEvent>,
    retire_rx: Consumer<Retired>,
}

impl ControlHandle {
    /// Send a command to the render thread.
    /// Returns the command back if the buffer is full.
    pub fn send_command(&mut self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.command_tx
            .push(cmd)
            .map_err(|rtrb::PushError::Full(cmd)| cmd)
    }

    /// Receive an event from the render thread.
    pub fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.pop().ok()
    }

    /// Receive one retired allocation.
    pub fn recv_retired(&mut self) -> Option<Retired> {
        self.retire_rx.pop().ok()
    }

    /// Drops every retired allocation on this thread. Returns how many.
    pub fn release_retired(&mut self) -> usize {
        std::iter::from_fn(|| self.recv_retired()).count()
    }

    /// Check how many commands can still be queued.
    pub fn command_slots_available(&self) -> usize {
        self.command_tx.slots()
    }

    /// Returns true once the render side has been dropped.
    pub fn is_render_gone(&self) -> bool {
        self.command_tx.is_abandoned()
    }
}

/// Render-side handle: command consumer, event and retire producers.
///
/// Every method is non-blocking and allocation-free.
pub struct RenderHandle {
    command_rx: Consumer<EngineCommand>,
    event_tx: Producer<EngineEvent>,
    retire_tx: Producer<Retired>,
}

impl RenderHandle {
    /// Receive a command from the control thread.
    pub fn recv_command(&mut self) -> Option<EngineCommand> {
        self.command_rx.pop().ok()
    }

    /// Try to send an event, dropping it if the buffer is full.
    pub fn send_event_lossy(&mut self, event: EngineEvent) {
        let _ = self.event_tx.push(event);
    }

    /// Hands an allocation back to the control thread.
    /// Returns it if the queue is full.
    pub fn retire(&mut self, item: Retired) -> Result<(), Retired> {
        self.retire_tx
            .push(item)
            .map_err(|rtrb::PushError::Full(item)| item)
    }
}
