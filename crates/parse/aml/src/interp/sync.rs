//! AML mutexes and events.
//!
//! The interpreter is single threaded, so contention only arises between
//! AML and the host. Waits poll [`Host::timer`] and sleep in 1 ms steps.

use super::Interpreter;
use super::state::State;
use crate::AmlError;
use crate::host::Host;
use crate::namespace::{EventObject, MutexObject, MutexOwner, NodeId, NodeKind};

/// Timeout value meaning "wait forever".
const WAIT_FOREVER: u64 = 0xFFFF;

/// Timer ticks (100 ns) per millisecond.
const TICKS_PER_MS: u64 = 10_000;

impl<H: Host> Interpreter<H> {
    fn mutex_mut(&mut self, node: NodeId) -> Result<&mut MutexObject, AmlError> {
        let node = self.namespace.resolve_alias(node);
        match self.namespace.node_mut(node)?.kind_mut() {
            NodeKind::Mutex(m) => Ok(m),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    fn event_mut(&mut self, node: NodeId) -> Result<&mut EventObject, AmlError> {
        let node = self.namespace.resolve_alias(node);
        match self.namespace.node_mut(node)?.kind_mut() {
            NodeKind::Event(e) => Ok(e),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    fn deadline(&self, timeout_ms: u64) -> Option<u64> {
        (timeout_ms < WAIT_FOREVER)
            .then(|| self.host.timer().saturating_add(timeout_ms * TICKS_PER_MS))
    }

    fn expired(&self, deadline: Option<u64>) -> bool {
        deadline.is_some_and(|d| self.host.timer() >= d)
    }

    /// Takes `node` for `owner`, polling until `timeout_ms` elapses.
    /// Returns `false` on timeout.
    fn lock_mutex(&mut self, node: NodeId, owner: MutexOwner, timeout_ms: u64) -> Result<bool, AmlError> {
        let deadline = self.deadline(timeout_ms);
        loop {
            let m = self.mutex_mut(node)?;
            match m.owner {
                None => {
                    m.owner = Some(owner);
                    m.depth = 1;
                    return Ok(true);
                }
                Some(current) if current == owner => {
                    m.depth += 1;
                    return Ok(true);
                }
                Some(_) => {}
            }
            if self.expired(deadline) {
                return Ok(false);
            }
            self.host.sleep(1);
        }
    }

    /// Drops one level of `owner`'s hold on `node`. Returns `false` if
    /// `owner` does not hold it.
    fn unlock_mutex(&mut self, node: NodeId, owner: MutexOwner) -> Result<bool, AmlError> {
        let m = self.mutex_mut(node)?;
        if m.owner != Some(owner) {
            return Ok(false);
        }
        m.depth = m.depth.saturating_sub(1);
        if m.depth == 0 {
            m.owner = None;
        }
        Ok(true)
    }

    /// AML `Acquire`. Returns `true` if the wait timed out.
    pub(crate) fn acquire_aml_mutex(
        &mut self,
        state: &mut State,
        node: NodeId,
        timeout_ms: u16,
    ) -> Result<bool, AmlError> {
        if !self.lock_mutex(node, MutexOwner::Aml, u64::from(timeout_ms))? {
            log::debug!("aml: Acquire({}) timed out", self.namespace.path_of(node));
            return Ok(true);
        }
        state.mutexes.push(node);
        Ok(false)
    }

    /// AML `Release`.
    pub(crate) fn release_mutex_op(&mut self, state: &mut State, node: NodeId) -> Result<(), AmlError> {
        if !self.unlock_mutex(node, MutexOwner::Aml)? {
            log::warn!(
                "aml: Release({}) of a mutex AML does not hold",
                self.namespace.path_of(node)
            );
            return Ok(());
        }
        if let Some(pos) = state.mutexes.iter().rposition(|&n| n == node) {
            state.mutexes.remove(pos);
        }
        Ok(())
    }

    /// Releases a level still held when an evaluation ends.
    pub(crate) fn release_aml_mutex(&mut self, node: NodeId) {
        match self.unlock_mutex(node, MutexOwner::Aml) {
            Ok(true) => log::warn!(
                "aml: releasing {} left acquired by AML",
                self.namespace.path_of(node)
            ),
            Ok(false) | Err(_) => {}
        }
    }

    /// AML `Reset`.
    pub(crate) fn reset_event(&mut self, node: NodeId) -> Result<(), AmlError> {
        self.event_mut(node)?.pending = 0;
        Ok(())
    }

    /// AML `Wait`. Returns `true` if the wait timed out.
    pub(crate) fn wait_event_op(&mut self, node: NodeId, timeout_ms: u64) -> Result<bool, AmlError> {
        match self.wait_event(node, timeout_ms.min(WAIT_FOREVER) as u16) {
            Ok(()) => Ok(false),
            Err(AmlError::Timeout) => Ok(true),
            Err(err) => Err(err),
        }
    }

    // ─── Host interface ────────────────────────────────────────────────────

    /// Acquires an AML mutex on behalf of the host, waiting up to
    /// `timeout_ms` milliseconds (`0xFFFF` waits forever). Host
    /// acquisitions nest.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::Timeout`] if AML holds the mutex past the
    /// timeout and [`AmlError::TypeMismatch`] if `node` is not a mutex.
    pub fn acquire_mutex(&mut self, node: NodeId, timeout_ms: u16) -> Result<(), AmlError> {
        if self.lock_mutex(node, MutexOwner::Host, u64::from(timeout_ms))? {
            Ok(())
        } else {
            Err(AmlError::Timeout)
        }
    }

    /// Releases one level of a host-held mutex.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] if the host does not hold the
    /// mutex and [`AmlError::TypeMismatch`] if `node` is not a mutex.
    pub fn release_mutex(&mut self, node: NodeId) -> Result<(), AmlError> {
        if self.unlock_mutex(node, MutexOwner::Host)? {
            Ok(())
        } else {
            Err(AmlError::IllegalArguments)
        }
    }

    /// Signals an AML event (AML `Signal` and host signals alike).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] if `node` is not an event.
    pub fn signal_event(&mut self, node: NodeId) -> Result<(), AmlError> {
        let e = self.event_mut(node)?;
        e.pending = e.pending.saturating_add(1);
        Ok(())
    }

    /// Consumes one signal of an AML event, waiting up to `timeout_ms`
    /// milliseconds (`0xFFFF` waits forever).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::Timeout`] if no signal arrives in time and
    /// [`AmlError::TypeMismatch`] if `node` is not an event.
    pub fn wait_event(&mut self, node: NodeId, timeout_ms: u16) -> Result<(), AmlError> {
        let deadline = self.deadline(u64::from(timeout_ms));
        loop {
            let e = self.event_mut(node)?;
            if e.pending > 0 {
                e.pending -= 1;
                return Ok(());
            }
            if self.expired(deadline) {
                return Err(AmlError::Timeout);
            }
            self.host.sleep(1);
        }
    }
}
