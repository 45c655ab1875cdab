//! Interlock status as reported by the `i` query.

use modular_bitfield::prelude::*;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, IntoStaticStr};

/// The emitter's interlocks, in the order their status characters are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCountMacro, IntoStaticStr)]
#[repr(u8)]
pub enum Interlock {
    /// 0: Tube cooling.
    #[strum(serialize = "Cooling")]
    Cooling = 0,
    /// 1: Overselect.
    #[strum(serialize = "Overselect")]
    Overselect = 1,
    /// 2: External safety interlock circuit.
    #[strum(serialize = "Interlock")]
    External = 2,
    /// 3: Output voltage above limit.
    #[strum(serialize = "Over kV")]
    OverKv = 3,
    /// 4: Output current above limit.
    #[strum(serialize = "Over mA")]
    OverMa = 4,
    /// 5: Mains supply.
    #[strum(serialize = "Supply")]
    Supply = 5,
    /// 6: Filament.
    #[strum(serialize = "Filament")]
    Filament = 6,
    /// 7: Measured kV differs from the setting.
    #[strum(serialize = "kV diff")]
    KvDiff = 7,
    /// 8: Measured mA differs from the setting.
    #[strum(serialize = "mA diff")]
    MaDiff = 8,
}

impl Interlock {
    /// Human readable name.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Fault flags for all 9 interlocks. `true` means the interlock is in fault.
///
/// Always built fresh from a response; an all-clear value is [`InterlockStatus::new`].
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterlockStatus {
    pub cooling: bool,
    pub overselect: bool,
    pub external: bool,
    pub over_kv: bool,
    pub over_ma: bool,
    pub supply: bool,
    pub filament: bool,
    pub kv_diff: bool,
    pub ma_diff: bool,
    #[skip]
    __: B7,
}

impl InterlockStatus {
    /// Interpret the payload of an interlock query.
    ///
    /// Anything other than exactly one character per interlock is treated as
    /// all clear. A position is in fault when its character is NUL.
    pub fn from_payload(payload: &str) -> Self {
        let mut status = Self::new();
        if payload.len() != Interlock::COUNT {
            return status;
        }
        for (interlock, byte) in Interlock::iter().zip(payload.bytes()) {
            status.set_interlock(interlock, byte == 0);
        }
        status
    }

    /// Whether `interlock` is in fault.
    pub fn is_faulted(&self, interlock: Interlock) -> bool {
        match interlock {
            Interlock::Cooling => self.cooling(),
            Interlock::Overselect => self.overselect(),
            Interlock::External => self.external(),
            Interlock::OverKv => self.over_kv(),
            Interlock::OverMa => self.over_ma(),
            Interlock::Supply => self.supply(),
            Interlock::Filament => self.filament(),
            Interlock::KvDiff => self.kv_diff(),
            Interlock::MaDiff => self.ma_diff(),
        }
    }

    pub fn set_interlock(&mut self, interlock: Interlock, faulted: bool) {
        match interlock {
            Interlock::Cooling => self.set_cooling(faulted),
            Interlock::Overselect => self.set_overselect(faulted),
            Interlock::External => self.set_external(faulted),
            Interlock::OverKv => self.set_over_kv(faulted),
            Interlock::OverMa => self.set_over_ma(faulted),
            Interlock::Supply => self.set_supply(faulted),
            Interlock::Filament => self.set_filament(faulted),
            Interlock::KvDiff => self.set_kv_diff(faulted),
            Interlock::MaDiff => self.set_ma_diff(faulted),
        }
    }

    /// Flags in interlock order.
    pub fn to_array(&self) -> [bool; Interlock::COUNT] {
        let mut flags = [false; Interlock::COUNT];
        for interlock in Interlock::iter() {
            flags[interlock as usize] = self.is_faulted(interlock);
        }
        flags
    }

    /// Interlocks currently in fault.
    pub fn faulted(&self) -> impl Iterator<Item = Interlock> + '_ {
        Interlock::iter().filter(|&interlock| self.is_faulted(interlock))
    }

    pub fn is_all_clear(&self) -> bool {
        self.faulted().next().is_none()
    }

    /// Comma separated names of the interlocks in fault, empty when all clear.
    pub fn error_text(&self) -> String {
        self.faulted()
            .map(Interlock::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
