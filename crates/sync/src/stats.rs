#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub updates_processed: u64,
    pub frames_created: u64,
    pub frames_evicted: u64,
    pub forced_resyncs: u64,
    pub entities_entered: u64,
    pub entities_left: u64,
    pub entities_delta_updated: u64,
    pub entities_preserved: u64,
    pub player_bits: u64,
    pub other_bits: u64,
}

impl SyncStats {
    pub fn total_bits(&self) -> u64 {
        self.player_bits + self.other_bits
    }
}
