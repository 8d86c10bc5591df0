//! Serial command protocol.
//!
//! Lane commands are newline-terminated ASCII lines:
//! - `AMBULANCE_LANE_<n>\n` - priority override for lane `n`
//! - `COUNT_LANE_<n>=<count>\n` - vehicle count for lane `n`
//!
//! Accident commands are single unterminated bytes: `A` (accident) or
//! `N` (normal).

use std::fmt;

use crate::aggregate::SignalState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Ambulance { lane: u8 },
    Count { lane: u8, count: u32 },
    Accident,
    Normal,
}

impl Command {
    /// Command for one notification tick. An ambulance always preempts the count.
    pub fn for_state(lane: u8, state: &SignalState) -> Self {
        if state.ambulance {
            Command::Ambulance { lane }
        } else {
            Command::Count {
                lane,
                count: state.vehicle_count,
            }
        }
    }

    /// Bytes written to the serial channel.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Ambulance { .. } | Command::Count { .. } => format!("{}\n", self).into_bytes(),
            Command::Accident => vec![b'A'],
            Command::Normal => vec![b'N'],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ambulance { lane } => write!(f, "AMBULANCE_LANE_{}", lane),
            Command::Count { lane, count } => write!(f, "COUNT_LANE_{}={}", lane, count),
            Command::Accident => f.write_str("A"),
            Command::Normal => f.write_str("N"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_commands_are_line_terminated() {
        assert_eq!(
            Command::Ambulance { lane: 2 }.encode(),
            b"AMBULANCE_LANE_2\n".to_vec()
        );
        assert_eq!(
            Command::Count { lane: 2, count: 0 }.encode(),
            b"COUNT_LANE_2=0\n".to_vec()
        );
        assert_eq!(
            Command::Count { lane: 3, count: 17 }.encode(),
            b"COUNT_LANE_3=17\n".to_vec()
        );
    }

    #[test]
    fn accident_commands_are_single_bytes() {
        assert_eq!(Command::Accident.encode(), b"A".to_vec());
        assert_eq!(Command::Normal.encode(), b"N".to_vec());
    }

    #[test]
    fn ambulance_preempts_count() {
        let state = SignalState {
            vehicle_count: 3,
            ambulance: true,
        };
        assert_eq!(Command::for_state(2, &state), Command::Ambulance { lane: 2 });

        let state = SignalState {
            vehicle_count: 3,
            ambulance: false,
        };
        assert_eq!(
            Command::for_state(2, &state),
            Command::Count { lane: 2, count: 3 }
        );
    }
}
