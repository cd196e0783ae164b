//! DMA transfer engine: one channel, one transfer at a time.
//!
//! ```text
//!   Idle ──arm──► Armed ──start──► Running ──done──► Completed ──arm──► Armed …
//!                                     │
//!                                     └──fault──► Faulted (terminal)
//! ```
//!
//! Completion and faults arrive as interrupts. The done and fault handlers
//! are plain [`FlagHandler`](crate::dispatch::FlagHandler)s raising the two
//! flags in [`DmaFlags`]; the engine consumes them in [`DmaEngine::poll`].
//! A fault observed together with done counts as a fault.

use platform::dma::{DmaBuffer, DmaBufferMut, DmaChannelId, DmaController, DmaTransfer, TransferFault};
use platform::dma_safety::{CacheCoherence, DataCache};
use thiserror::Error;

use crate::event::EventFlag;

/// Done / fault flags shared between the DMA interrupt handlers and the engine.
#[derive(Debug, Default)]
pub struct DmaFlags {
    /// Raised by the channel's done interrupt
    pub done: EventFlag,
    /// Raised by the controller's abort interrupt
    pub fault: EventFlag,
}

impl DmaFlags {
    /// Both flags lowered. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            done: EventFlag::new(),
            fault: EventFlag::new(),
        }
    }
}

/// Transfer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaState {
    /// Nothing armed yet
    Idle,
    /// Descriptor validated, not started
    Armed,
    /// Controller owns the buffers
    Running,
    /// Done interrupt observed
    Completed,
    /// Fault interrupt observed; no further transfers
    Faulted,
}

/// DMA engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// The descriptor failed validation.
    #[error("invalid transfer: {0}")]
    InvalidTransfer(#[from] TransferFault),
    /// A transfer is already armed or running.
    #[error("a transfer is already armed or running")]
    Busy,
    /// `start` or `wait` without an armed transfer.
    #[error("no transfer armed")]
    NotArmed,
    /// The engine saw a fault and refuses further work.
    #[error("DMA controller faulted")]
    Faulted,
    /// The controller driver rejected the transfer.
    #[error("DMA controller rejected the transfer")]
    Controller,
}

/// Single-channel transfer engine over a [`DmaController`].
pub struct DmaEngine<'f, C> {
    controller: C,
    channel: DmaChannelId,
    flags: &'f DmaFlags,
    state: DmaState,
    transfer: DmaTransfer,
}

impl<'f, C: DmaController> DmaEngine<'f, C> {
    /// Engine for `channel`, reporting through `flags`.
    ///
    /// Bind the done and fault handlers to `flags` before the first start.
    pub fn new(controller: C, channel: DmaChannelId, flags: &'f DmaFlags) -> Self {
        Self {
            controller,
            channel,
            flags,
            state: DmaState::Idle,
            transfer: DmaTransfer::zeroed(),
        }
    }

    /// Whether buffers need cache maintenance (or a disabled cache) around
    /// each transfer.
    pub fn requires_cache_coherence_handling(&self) -> bool {
        self.controller.coherence() == CacheCoherence::NonCoherent
    }

    /// Validate and store `transfer` for the next start.
    ///
    /// Stale done / fault flags from before this call are discarded.
    ///
    /// # Safety
    ///
    /// The memory `transfer` describes must stay valid, and must not be
    /// touched by the CPU, from [`DmaEngine::start`] until [`DmaEngine::poll`]
    /// reports [`DmaState::Completed`] or [`DmaState::Faulted`].
    pub unsafe fn arm(&mut self, transfer: DmaTransfer) -> Result<(), DmaError> {
        match self.state {
            DmaState::Faulted => return Err(DmaError::Faulted),
            DmaState::Armed | DmaState::Running => return Err(DmaError::Busy),
            DmaState::Idle | DmaState::Completed => {}
        }
        transfer.validate()?;
        let _ = self.flags.done.take();
        let _ = self.flags.fault.take();
        self.transfer = transfer;
        self.state = DmaState::Armed;
        Ok(())
    }

    /// Hand the armed transfer to the controller.
    pub fn start(&mut self) -> Result<(), DmaError> {
        match self.state {
            DmaState::Armed => {}
            DmaState::Faulted => return Err(DmaError::Faulted),
            _ => return Err(DmaError::NotArmed),
        }
        // SAFETY: the descriptor passed `validate` in `arm`, whose caller
        // promised the buffers stay valid and untouched until completion.
        let started = unsafe { self.controller.start(self.channel, &self.transfer) };
        if let Err(_e) = started {
            #[cfg(feature = "defmt")]
            defmt::error!("DMA channel {} refused transfer", self.channel.0);
            #[cfg(feature = "tracing")]
            tracing::error!(channel = self.channel.0, error = ?_e, "DMA start refused");
            self.state = DmaState::Faulted;
            return Err(DmaError::Controller);
        }
        self.state = DmaState::Running;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            channel = self.channel.0,
            bytes = self.transfer.length_bytes(),
            "DMA transfer started"
        );
        Ok(())
    }

    /// Arm and start in one call.
    ///
    /// # Safety
    ///
    /// Same contract as [`DmaEngine::arm`].
    pub unsafe fn launch(&mut self, transfer: DmaTransfer) -> Result<(), DmaError> {
        // SAFETY: forwarded to the caller.
        unsafe { self.arm(transfer)? };
        self.start()
    }

    /// Consume pending done / fault events and report the state.
    pub fn poll(&mut self) -> DmaState {
        if self.state == DmaState::Running {
            if self.flags.fault.take() {
                let _ = self.flags.done.take();
                self.state = DmaState::Faulted;
                #[cfg(feature = "defmt")]
                defmt::error!("DMA channel {} faulted", self.channel.0);
                #[cfg(feature = "tracing")]
                tracing::error!(channel = self.channel.0, "DMA fault");
            } else if self.flags.done.take() {
                self.state = DmaState::Completed;
            }
        }
        self.state
    }

    /// Spin until the running transfer completes or faults.
    pub fn wait(&mut self) -> Result<(), DmaError> {
        loop {
            match self.poll() {
                DmaState::Completed => return Ok(()),
                DmaState::Faulted => return Err(DmaError::Faulted),
                DmaState::Running => core::hint::spin_loop(),
                DmaState::Idle | DmaState::Armed => return Err(DmaError::NotArmed),
            }
        }
    }

    /// Current state without consuming events.
    pub fn state(&self) -> DmaState {
        self.state
    }

    /// Channel this engine drives.
    pub fn channel(&self) -> DmaChannelId {
        self.channel
    }

    /// The controller driver.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The controller driver, mutably.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }
}

/// Cache maintenance around one transfer on a non-coherent controller.
///
/// Cleans the source so the DMAC reads what the CPU wrote; invalidates the
/// destination so the CPU later reads what the DMAC wrote, not stale lines.
/// Buffers should be [`Align32`](platform::dma_safety::Align32) so
/// invalidation never discards neighbouring data.
pub fn maintain_for_transfer<K, S, D>(cache: &mut K, source: &S, destination: &D)
where
    K: DataCache,
    S: DmaBuffer + ?Sized,
    D: DmaBufferMut + ?Sized,
{
    if !cache.is_enabled() {
        return;
    }
    cache.clean_range(source.as_ptr() as usize, source.len());
    cache.invalidate_range(destination.as_ptr() as usize, destination.len());
}

/// Invalidate `destination` again after completion, dropping lines the CPU
/// may have speculatively fetched while the transfer ran.
pub fn maintain_after_transfer<K, D>(cache: &mut K, destination: &D)
where
    K: DataCache,
    D: DmaBufferMut + ?Sized,
{
    if cache.is_enabled() {
        cache.invalidate_range(destination.as_ptr() as usize, destination.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchTable, FlagHandler};
    use platform::dma_safety::Align32;
    use platform::interrupt::IrqSource;
    use platform::mocks::{MockDataCache, MockDma, MockDmaBehavior};

    const CH0: DmaChannelId = DmaChannelId(0);
    const DONE: IrqSource = IrqSource(46);
    const FAULT: IrqSource = IrqSource(45);

    fn pattern() -> Align32<[u8; 128]> {
        let mut src = Align32([0u8; 128]);
        for (i, b) in src.iter_mut().enumerate() {
            *b = i as u8;
        }
        src
    }

    #[test]
    fn copy_completes_through_done_interrupt() {
        let flags = DmaFlags::new();
        let dma = MockDma::new();
        let done = FlagHandler::new(dma.done_line(CH0), &flags.done);
        let fault = FlagHandler::new(dma.fault_line(), &flags.fault);
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        table.bind(DONE, &done).unwrap();
        table.bind(FAULT, &fault).unwrap();
        table.enable(DONE).unwrap();
        table.enable(FAULT).unwrap();

        let mut engine = DmaEngine::new(dma, CH0, &flags);
        assert!(engine.requires_cache_coherence_handling());
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();

        unsafe { engine.launch(transfer).unwrap() };
        assert_eq!(engine.poll(), DmaState::Running);
        table.dispatch(DONE);
        engine.wait().unwrap();
        assert_eq!(engine.state(), DmaState::Completed);
        assert_eq!(src.0, dst.0);
    }

    #[test]
    fn invalid_descriptor_is_rejected_before_the_controller() {
        let flags = DmaFlags::new();
        let mut engine = DmaEngine::new(MockDma::new(), CH0, &flags);
        let err = unsafe { engine.arm(DmaTransfer::zeroed()) };
        assert_eq!(err, Err(DmaError::InvalidTransfer(TransferFault::ZeroLength)));
        assert_eq!(engine.state(), DmaState::Idle);
        assert!(engine.controller().started().is_empty());
    }

    #[test]
    fn null_source_never_reaches_the_controller() {
        let flags = DmaFlags::new();
        let mut engine = DmaEngine::new(MockDma::new(), CH0, &flags);
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::zeroed()
            .with_destination(dst.as_mut_ptr())
            .with_length(128)
            .with_burst(4, 4)
            .with_increments(true, true);
        let err = unsafe { engine.launch(transfer) };
        assert_eq!(err, Err(DmaError::InvalidTransfer(TransferFault::NullSource)));
        assert_eq!(engine.state(), DmaState::Idle);
        assert!(engine.controller().started().is_empty());
        assert_eq!(dst.0, [0u8; 128]);
    }

    #[test]
    fn second_arm_while_running_is_busy() {
        let flags = DmaFlags::new();
        let mut engine = DmaEngine::new(MockDma::new().with_deferred_signal(), CH0, &flags);
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();
        unsafe { engine.launch(transfer).unwrap() };
        assert_eq!(unsafe { engine.arm(transfer) }, Err(DmaError::Busy));
    }

    #[test]
    fn fault_is_terminal_and_beats_done() {
        let flags = DmaFlags::new();
        let mut dma = MockDma::new();
        dma.set_behavior(MockDmaBehavior::Fault);
        let mut engine = DmaEngine::new(dma, CH0, &flags);
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();
        unsafe { engine.launch(transfer).unwrap() };

        flags.done.raise();
        flags.fault.raise();
        assert_eq!(engine.wait(), Err(DmaError::Faulted));
        assert_eq!(unsafe { engine.arm(transfer) }, Err(DmaError::Faulted));
        assert_eq!(engine.start(), Err(DmaError::Faulted));
    }

    #[test]
    fn stale_flags_do_not_complete_a_new_transfer() {
        let flags = DmaFlags::new();
        flags.done.raise();
        let mut engine = DmaEngine::new(MockDma::new().with_deferred_signal(), CH0, &flags);
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();
        unsafe { engine.launch(transfer).unwrap() };
        assert_eq!(engine.poll(), DmaState::Running);
    }

    #[test]
    fn start_without_arm_fails() {
        let flags = DmaFlags::new();
        let mut engine = DmaEngine::new(MockDma::new(), CH0, &flags);
        assert_eq!(engine.start(), Err(DmaError::NotArmed));
        assert_eq!(engine.wait(), Err(DmaError::NotArmed));
    }

    #[test]
    fn controller_refusal_faults_the_engine() {
        let flags = DmaFlags::new();
        let mut engine = DmaEngine::new(MockDma::new(), DmaChannelId(9), &flags);
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        let transfer = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();
        assert_eq!(unsafe { engine.launch(transfer) }, Err(DmaError::Controller));
        assert_eq!(engine.state(), DmaState::Faulted);
    }

    #[test]
    fn coherent_controller_needs_no_maintenance() {
        let flags = DmaFlags::new();
        let dma = MockDma::new().with_coherence(CacheCoherence::Coherent);
        let engine = DmaEngine::new(dma, CH0, &flags);
        assert!(!engine.requires_cache_coherence_handling());
    }

    #[test]
    fn maintenance_cleans_source_and_invalidates_destination() {
        let mut cache = MockDataCache::new();
        let src = pattern();
        let mut dst = Align32([0u8; 128]);
        maintain_for_transfer(&mut cache, &src, &dst);
        maintain_after_transfer(&mut cache, &dst);
        assert_eq!(cache.cleaned(), &[(src.as_ptr() as usize, 128)]);
        assert_eq!(cache.invalidated().len(), 2);
        assert_eq!(cache.invalidated()[0], (dst.as_mut_ptr() as usize, 128));
    }

    #[test]
    fn disabled_cache_skips_maintenance() {
        let mut cache = MockDataCache::new();
        cache.disable();
        let src = pattern();
        let dst = Align32([0u8; 128]);
        maintain_for_transfer(&mut cache, &src, &dst);
        assert!(cache.cleaned().is_empty());
        assert!(cache.invalidated().is_empty());
    }
}
