//! Deterministic fault injection for testing
//!
//! This module lets tests make the simulated kernel fail at the points a
//! real kernel can fail a driver: claiming device numbers, adding the
//! character device, and copying across the user boundary.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: Faults fire by count, never by chance
//! - **Composable**: Multiple faults can be combined in one plan
//! - **Test-focused**: Not intended for production use
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{FaultPlan, RegistrationFault, UserCopyFault};
//!
//! let plan = FaultPlan::new()
//!     .with_registration_fault(RegistrationFault::FailCdevAdd)
//!     .with_user_copy_fault(UserCopyFault::FailNext { count: 1 });
//! ```

/// A fault to inject into device registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationFault {
    /// The next `register_chrdev_region` fails with `Busy`
    FailRegionClaim,

    /// The next `cdev_add` fails with `OutOfMemory`
    FailCdevAdd,
}

/// A fault to inject into copies across the user boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCopyFault {
    /// The next `count` copies to user memory fault
    FailNext { count: usize },

    /// Copies fault once `after` copies have succeeded, then `count` times
    FailAfter { after: usize, count: usize },
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    registration_faults: Vec<RegistrationFault>,
    user_copy_faults: Vec<UserCopyFault>,
}

impl FaultPlan {
    /// Creates a new empty fault plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration fault to the plan
    pub fn with_registration_fault(mut self, fault: RegistrationFault) -> Self {
        self.registration_faults.push(fault);
        self
    }

    /// Adds a user copy fault to the plan
    pub fn with_user_copy_fault(mut self, fault: UserCopyFault) -> Self {
        self.user_copy_faults.push(fault);
        self
    }

    /// Returns a reference to the registration faults
    pub fn registration_faults(&self) -> &[RegistrationFault] {
        &self.registration_faults
    }

    /// Returns a reference to the user copy faults
    pub fn user_copy_faults(&self) -> &[UserCopyFault] {
        &self.user_copy_faults
    }
}

/// Fault injector that applies a [`FaultPlan`]
///
/// Each registration fault fires once. User copy faults count down.
#[derive(Debug)]
pub struct FaultInjector {
    fail_region_claim: bool,
    fail_cdev_add: bool,
    copies_seen: usize,
    // (first failing copy index, remaining failures)
    copy_windows: Vec<(usize, usize)>,
    faults_fired: usize,
}

impl FaultInjector {
    /// Creates a new fault injector with the given plan
    pub fn new(plan: FaultPlan) -> Self {
        let mut injector = Self {
            fail_region_claim: false,
            fail_cdev_add: false,
            copies_seen: 0,
            copy_windows: Vec::new(),
            faults_fired: 0,
        };

        for fault in plan.registration_faults() {
            match fault {
                RegistrationFault::FailRegionClaim => injector.fail_region_claim = true,
                RegistrationFault::FailCdevAdd => injector.fail_cdev_add = true,
            }
        }

        for fault in plan.user_copy_faults() {
            let window = match *fault {
                UserCopyFault::FailNext { count } => (0, count),
                UserCopyFault::FailAfter { after, count } => (after, count),
            };
            injector.copy_windows.push(window);
        }

        injector
    }

    /// Checks if the current region claim should fail
    pub fn should_fail_region_claim(&mut self) -> bool {
        let armed = std::mem::take(&mut self.fail_region_claim);
        self.count(armed)
    }

    /// Checks if the current `cdev_add` should fail
    pub fn should_fail_cdev_add(&mut self) -> bool {
        let armed = std::mem::take(&mut self.fail_cdev_add);
        self.count(armed)
    }

    /// Checks if the current copy to user memory should fault
    ///
    /// Every call counts as one copy attempt.
    pub fn should_fault_user_copy(&mut self) -> bool {
        let index = self.copies_seen;
        self.copies_seen += 1;

        let hit = self
            .copy_windows
            .iter_mut()
            .find(|(first, remaining)| index >= *first && *remaining > 0);
        match hit {
            Some((_, remaining)) => {
                *remaining -= 1;
                self.faults_fired += 1;
                true
            }
            None => false,
        }
    }

    /// Returns the number of faults injected so far
    pub fn faults_fired(&self) -> usize {
        self.faults_fired
    }

    fn count(&mut self, fired: bool) -> bool {
        if fired {
            self.faults_fired += 1;
        }
        fired
    }
}
