//! Compiled-in STM32 device-id tables
//!
//! Device ids are the 12-bit `DEV_ID` field of `DBGMCU_IDCODE`. Default part
//! numbers use J-Link device names so they can be passed to the probe as-is.

/// device-id -> family name
pub static FAMILIES: &[(u16, &str)] = &[
    // STM32F0
    (0x440, "STM32F030x8/F05x"),
    (0x442, "STM32F09x"),
    (0x444, "STM32F03x"),
    (0x445, "STM32F04x"),
    (0x448, "STM32F07x"),
    // STM32F1
    (0x410, "STM32F10x Medium-density"),
    (0x412, "STM32F10x Low-density"),
    (0x414, "STM32F10x High-density"),
    (0x418, "STM32F10x Connectivity line"),
    (0x420, "STM32F10x Medium-density value line"),
    (0x428, "STM32F10x High-density value line"),
    (0x430, "STM32F10x XL-density"),
    // STM32F2
    (0x411, "STM32F2xx"),
    // STM32F3
    (0x422, "STM32F302xB/C/303xB/C"),
    (0x432, "STM32F37x"),
    (0x438, "STM32F303x6/8/334"),
    (0x439, "STM32F301/302x6/8"),
    (0x446, "STM32F303xD/E"),
    // STM32F4
    (0x413, "STM32F405/407/415/417"),
    (0x419, "STM32F42x/43x"),
    (0x421, "STM32F446"),
    (0x423, "STM32F401xB/C"),
    (0x431, "STM32F411"),
    (0x433, "STM32F401xD/E"),
    (0x434, "STM32F469/479"),
    (0x441, "STM32F412"),
    (0x458, "STM32F410"),
    (0x463, "STM32F413/423"),
    // STM32F7
    (0x449, "STM32F74xxx/75xxx"),
    (0x451, "STM32F76xxx/77xxx"),
    (0x452, "STM32F72xxx/73xxx"),
    // STM32G0/G4
    (0x460, "STM32G07x/08x"),
    (0x466, "STM32G03x/04x"),
    (0x467, "STM32G0Bx/0Cx"),
    (0x468, "STM32G431/441"),
    (0x469, "STM32G47x/48x"),
    (0x479, "STM32G491/4A1"),
    // STM32H7
    (0x450, "STM32H74x/75x"),
    (0x480, "STM32H7A3/7B3"),
    (0x483, "STM32H72x/73x"),
    // STM32L0/L1
    (0x416, "STM32L1 Cat.1"),
    (0x417, "STM32L05x/06x"),
    (0x427, "STM32L1 Cat.3"),
    (0x436, "STM32L1 Cat.4"),
    (0x437, "STM32L1 Cat.5"),
    (0x447, "STM32L07x/08x"),
    (0x457, "STM32L01x/02x"),
    // STM32L4/L5
    (0x415, "STM32L47x/48x"),
    (0x435, "STM32L43x/44x"),
    (0x461, "STM32L496/4A6"),
    (0x462, "STM32L45x/46x"),
    (0x464, "STM32L41x/42x"),
    (0x470, "STM32L4R/4S"),
    (0x471, "STM32L4P5/4Q5"),
    (0x472, "STM32L55x/56x"),
    // STM32U5/WB/WL
    (0x482, "STM32U575/585"),
    (0x495, "STM32WB55"),
    (0x497, "STM32WLE5/WL55"),
];

/// device-id -> default J-Link part number
pub static DEFAULT_PARTS: &[(u16, &str)] = &[
    (0x440, "STM32F030R8"),
    (0x442, "STM32F091RC"),
    (0x444, "STM32F030F4"),
    (0x445, "STM32F042K6"),
    (0x448, "STM32F072RB"),
    (0x410, "STM32F103C8"),
    (0x412, "STM32F103C6"),
    (0x414, "STM32F103RE"),
    (0x418, "STM32F107VC"),
    (0x420, "STM32F100RB"),
    (0x428, "STM32F100RE"),
    (0x430, "STM32F103ZG"),
    (0x411, "STM32F207ZG"),
    (0x422, "STM32F303VC"),
    (0x432, "STM32F373CC"),
    (0x438, "STM32F334R8"),
    (0x439, "STM32F302R8"),
    (0x446, "STM32F303RE"),
    (0x413, "STM32F407VG"),
    (0x419, "STM32F429ZI"),
    (0x421, "STM32F446RE"),
    (0x423, "STM32F401CC"),
    (0x431, "STM32F411RE"),
    (0x433, "STM32F401RE"),
    (0x434, "STM32F469NI"),
    (0x441, "STM32F412ZG"),
    (0x458, "STM32F410RB"),
    (0x463, "STM32F413ZH"),
    (0x449, "STM32F746ZG"),
    (0x451, "STM32F765ZG"),
    (0x452, "STM32F722ZE"),
    (0x460, "STM32G071RB"),
    (0x466, "STM32G031K8"),
    (0x467, "STM32G0B1RE"),
    (0x468, "STM32G431RB"),
    (0x469, "STM32G474RE"),
    (0x479, "STM32G491RE"),
    (0x450, "STM32H743ZI"),
    (0x480, "STM32H7A3ZI"),
    (0x483, "STM32H723ZG"),
    (0x416, "STM32L152RB"),
    (0x417, "STM32L053R8"),
    (0x427, "STM32L152RC"),
    (0x436, "STM32L152RE"),
    (0x437, "STM32L152ZE"),
    (0x447, "STM32L073RZ"),
    (0x457, "STM32L011K4"),
    (0x415, "STM32L476RG"),
    (0x435, "STM32L432KC"),
    (0x461, "STM32L496ZG"),
    (0x462, "STM32L452RE"),
    (0x464, "STM32L412KB"),
    (0x470, "STM32L4R5ZI"),
    (0x471, "STM32L4P5ZG"),
    (0x472, "STM32L552ZE"),
    (0x482, "STM32U575ZI"),
    (0x495, "STM32WB55RG"),
    (0x497, "STM32WL55JC"),
];
