/// The operation that produced the previous output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Regular decode.
    #[default]
    Normal,
    /// Packet-loss concealment.
    Expand,
    /// Concealment merged back into decoded audio.
    Merge,
    /// Time compression.
    Accelerate,
    /// Time expansion ahead of an underrun.
    PreemptiveExpand,
    /// RFC 3389 comfort noise.
    Rfc3389Cng,
    /// Codec-internal comfort noise.
    CodecInternalCng,
    /// DTMF tone generation.
    Dtmf,
    Undefined,
}

impl Mode {
    /// Whether the previous frame was concealment output.
    pub fn is_concealment(self) -> bool {
        self == Mode::Expand
    }

    /// Whether the previous frame was RFC 3389 comfort noise.
    pub fn is_comfort_noise(self) -> bool {
        self == Mode::Rfc3389Cng
    }
}
