//! DMA copy loop: memory-to-memory copy of a 128-byte pattern, verified
//! after every completion.
//!
//! The source starts as `0, 1, .., 127`. After each verified copy every
//! source byte is incremented (wrapping) and the copy runs again, so a
//! stale destination never passes verification twice.

use control_core::dispatch::{FlagHandler, InterruptManager};
use control_core::dma::{maintain_after_transfer, maintain_for_transfer, DmaEngine, DmaFlags, DmaState};
use control_core::fatal::{verify_copy, FatalReason};
use platform::dma::{DmaChannelId, DmaController, DmaTransfer};
use platform::dma_safety::{Align32, DataCache};
use platform::interrupt::{InterruptController, IrqSource};

use super::{ControlLoop, Progress};
use crate::board::{self, DMA_BUFFER_LEN};

/// Cache-aligned copy buffer.
pub type CopyBuffer = Align32<[u8; DMA_BUFFER_LEN]>;

/// How the loop keeps the CPU and the DMAC agreeing on buffer contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CachePolicy {
    /// Turn the data cache off once at boot.
    DisableAtBoot,
    /// Clean the source and invalidate the destination around every copy.
    MaintainByRange,
}

/// DMA loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaLoopConfig {
    /// Channel to copy on
    pub channel: DmaChannelId,
    /// Channel done interrupt
    pub done_irq: IrqSource,
    /// Controller abort interrupt
    pub fault_irq: IrqSource,
    /// Cache handling on a non-coherent controller
    pub cache_policy: CachePolicy,
}

impl Default for DmaLoopConfig {
    fn default() -> Self {
        Self {
            channel: board::DMA_CHANNEL,
            done_irq: board::DMA_DONE0_IRQ,
            fault_irq: board::DMA_FAULT_IRQ,
            cache_policy: CachePolicy::DisableAtBoot,
        }
    }
}

/// Storage for the done and fault handlers.
pub struct DmaHandlerSlots<'a, L> {
    /// Done handler
    pub done: Option<FlagHandler<'a, L>>,
    /// Fault handler
    pub fault: Option<FlagHandler<'a, L>>,
}

impl<L> DmaHandlerSlots<'_, L> {
    /// Both slots empty. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            done: None,
            fault: None,
        }
    }
}

impl<L> Default for DmaHandlerSlots<'_, L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies, verifies, mutates, repeats.
pub struct DmaLoop<'a, C, K> {
    engine: DmaEngine<'a, C>,
    cache: K,
    cache_policy: CachePolicy,
    source: &'a mut CopyBuffer,
    destination: &'a mut CopyBuffer,
    transfers: u32,
}

impl<'a, C, K> DmaLoop<'a, C, K>
where
    C: DmaController,
    C::Line: 'a,
    K: DataCache,
{
    /// Fill the source pattern, bind both handlers and launch the first copy.
    #[allow(clippy::too_many_arguments)]
    pub fn init<G: InterruptController, const N: usize>(
        controller: C,
        mut cache: K,
        irq: &mut InterruptManager<'_, 'a, G, N>,
        flags: &'a DmaFlags,
        slots: &'a mut DmaHandlerSlots<'a, C::Line>,
        source: &'a mut CopyBuffer,
        destination: &'a mut CopyBuffer,
        config: DmaLoopConfig,
    ) -> Result<Self, FatalReason> {
        for (value, byte) in (0u8..).zip(source.iter_mut()) {
            *byte = value;
        }

        let engine = DmaEngine::new(controller, config.channel, flags);
        if engine.requires_cache_coherence_handling()
            && config.cache_policy == CachePolicy::DisableAtBoot
        {
            cache.disable();
            #[cfg(feature = "defmt")]
            defmt::info!("data cache disabled for DMA");
            #[cfg(feature = "emulator")]
            tracing::info!("data cache disabled for DMA");
        }

        let done: &'a FlagHandler<'a, C::Line> = slots.done.insert(FlagHandler::new(
            engine.controller().done_line(config.channel),
            &flags.done,
        ));
        let fault: &'a FlagHandler<'a, C::Line> = slots
            .fault
            .insert(FlagHandler::new(engine.controller().fault_line(), &flags.fault));
        irq.bind(config.done_irq, done)?;
        irq.bind(config.fault_irq, fault)?;
        irq.enable(config.done_irq)?;
        irq.enable(config.fault_irq)?;

        let mut lp = Self {
            engine,
            cache,
            cache_policy: config.cache_policy,
            source,
            destination,
            transfers: 0,
        };
        lp.launch()?;
        Ok(lp)
    }

    fn launch(&mut self) -> Result<(), FatalReason> {
        let transfer = DmaTransfer::mem_to_mem(&*self.source, &mut *self.destination)
            .map_err(control_core::dma::DmaError::from)?;
        if self.engine.requires_cache_coherence_handling() {
            maintain_for_transfer(&mut self.cache, &*self.source, &*self.destination);
        }
        // SAFETY: both buffers are exclusively borrowed by this loop for
        // `'a`, and the loop touches them only after `poll` reports the
        // transfer finished.
        unsafe { self.engine.launch(transfer)? };
        Ok(())
    }

    /// Verified copies so far.
    pub fn transfers(&self) -> u32 {
        self.transfers
    }

    /// Configured cache handling.
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    /// The data cache driver.
    pub fn cache(&self) -> &K {
        &self.cache
    }

    /// The transfer engine.
    pub fn engine(&self) -> &DmaEngine<'a, C> {
        &self.engine
    }

    /// The transfer engine, mutably.
    pub fn engine_mut(&mut self) -> &mut DmaEngine<'a, C> {
        &mut self.engine
    }

    /// Source buffer contents. Only meaningful between transfers.
    pub fn source(&self) -> &[u8; DMA_BUFFER_LEN] {
        &self.source.0
    }
}

impl<'a, C, K> ControlLoop for DmaLoop<'a, C, K>
where
    C: DmaController,
    C::Line: 'a,
    K: DataCache,
{
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        match self.engine.poll() {
            DmaState::Running | DmaState::Idle | DmaState::Armed => Ok(Progress::Idle),
            DmaState::Faulted => Err(control_core::dma::DmaError::Faulted.into()),
            DmaState::Completed => {
                if self.engine.requires_cache_coherence_handling() {
                    maintain_after_transfer(&mut self.cache, &*self.destination);
                }
                verify_copy(&self.source.0, &self.destination.0)?;
                self.transfers = self.transfers.wrapping_add(1);
                #[cfg(feature = "emulator")]
                tracing::debug!(transfers = self.transfers, "DMA copy verified");

                for byte in self.source.iter_mut() {
                    *byte = byte.wrapping_add(1);
                }
                self.launch()?;
                Ok(Progress::Acted)
            }
        }
    }
}
