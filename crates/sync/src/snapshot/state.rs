use rkyv::{Archive, Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-entity header flags carried by a snapshot update entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: u8 {
        const ENTER_PVS = 1 << 0;
        const LEAVE_PVS = 1 << 1;
        const DELETE = 1 << 2;
        const FROM_BASELINE = 1 << 3;
        const FORCE_TRANSMIT = 1 << 4;
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct EntityState {
    pub entity: u32,
    pub class_id: u8,
    pub position: [f32; 3],
    pub velocity: [i16; 3],
    pub orientation: [i16; 4],
    pub flags: u16,
}

impl EntityState {
    pub const MAX_VELOCITY: f32 = 327.67;

    pub fn new(entity: u32, class_id: u8) -> Self {
        Self {
            entity,
            class_id,
            position: [0.0; 3],
            velocity: [0; 3],
            orientation: [0, 0, 0, 32767],
            flags: 0,
        }
    }

    pub fn encode_velocity(&mut self, vel: [f32; 3]) {
        self.velocity = [
            (vel[0].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 100.0) as i16,
            (vel[1].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 100.0) as i16,
            (vel[2].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 100.0) as i16,
        ];
    }

    pub fn decode_velocity(&self) -> [f32; 3] {
        [
            self.velocity[0] as f32 / 100.0,
            self.velocity[1] as f32 / 100.0,
            self.velocity[2] as f32 / 100.0,
        ]
    }

    pub fn encode_orientation(&mut self, quat: [f32; 4]) {
        self.orientation = [
            (quat[0].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[1].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[2].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[3].clamp(-1.0, 1.0) * 32767.0) as i16,
        ];
    }

    pub fn decode_orientation(&self) -> [f32; 4] {
        [
            self.orientation[0] as f32 / 32767.0,
            self.orientation[1] as f32 / 32767.0,
            self.orientation[2] as f32 / 32767.0,
            self.orientation[3] as f32 / 32767.0,
        ]
    }

    pub fn differs_from(&self, other: &EntityState) -> bool {
        self.class_id != other.class_id
            || self.position != other.position
            || self.velocity != other.velocity
            || self.orientation != other.orientation
            || self.flags != other.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_quantization_roundtrip() {
        let mut state = EntityState::new(1, 0);
        state.encode_velocity([10.5, -5.25, 0.0]);

        let vel = state.decode_velocity();
        assert!((vel[0] - 10.5).abs() < 0.01);
        assert!((vel[1] - -5.25).abs() < 0.01);
        assert!(vel[2].abs() < 0.01);
    }

    #[test]
    fn header_flags_roundtrip_through_raw_bits() {
        let flags = HeaderFlags::ENTER_PVS | HeaderFlags::FROM_BASELINE;
        let raw = flags.bits();
        assert_eq!(HeaderFlags::from_bits_truncate(raw), flags);
    }

    #[test]
    fn differs_from_ignores_entity_index() {
        let a = EntityState::new(1, 0);
        let mut b = EntityState::new(2, 0);
        assert!(!a.differs_from(&b));

        b.position = [1.0, 0.0, 0.0];
        assert!(a.differs_from(&b));
    }
}
