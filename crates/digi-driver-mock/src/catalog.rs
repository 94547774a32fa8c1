//! Preset board models for the mock digitizer.

/// Static description of a digitizer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    /// Model name as reported by the board
    pub model_name: &'static str,
    /// Numeric model code
    pub model_no: u32,
    /// Number of input channels
    pub channels: u32,
    /// Number of channel groups (1 = ungrouped)
    pub groups: u32,
    /// ADC resolution in bits
    pub adc_bits: u32,
    /// Form factor
    pub form_factor: &'static str,
    /// Family code
    pub family_code: u32,
}

/// Desktop 4 channel, 14 bit, ungrouped.
pub const DT5724: ModelPreset = ModelPreset {
    model_name: "DT5724",
    model_no: 12,
    channels: 4,
    groups: 1,
    adc_bits: 14,
    form_factor: "desktop",
    family_code: 0,
};

/// VME 8 channel, 14 bit, ungrouped.
pub const V1724: ModelPreset = ModelPreset {
    model_name: "V1724",
    model_no: 0,
    channels: 8,
    groups: 1,
    adc_bits: 14,
    form_factor: "VME64",
    family_code: 0,
};

/// VME 16 channel, 14 bit, ungrouped.
pub const V1725: ModelPreset = ModelPreset {
    model_name: "V1725",
    model_no: 33,
    channels: 16,
    groups: 1,
    adc_bits: 14,
    form_factor: "VME64",
    family_code: 14,
};

/// Desktop 16 channel switched-capacitor board in 2 groups of 8.
pub const DT5742: ModelPreset = ModelPreset {
    model_name: "DT5742",
    model_no: 26,
    channels: 16,
    groups: 2,
    adc_bits: 12,
    form_factor: "desktop",
    family_code: 6,
};

/// VME 64 channel, 12 bit, 8 groups of 8.
pub const V1740: ModelPreset = ModelPreset {
    model_name: "V1740",
    model_no: 4,
    channels: 64,
    groups: 8,
    adc_bits: 12,
    form_factor: "VME64",
    family_code: 4,
};

/// All presets, indexed by the link number the mock connector maps them to.
pub const CATALOG: &[ModelPreset] = &[DT5724, V1724, V1725, DT5742, V1740];
