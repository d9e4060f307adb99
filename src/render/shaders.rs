//! Embedded SPIR-V for the overlay pipeline.
//!
//! Pre-assembled word arrays, equivalent to:
//!
//! ```glsl
//! // vertex
//! #version 450
//! layout(location = 0) in vec2 in_pos;    // clip space
//! layout(location = 1) in vec2 in_uv;
//! layout(location = 2) in vec3 in_color;
//! layout(location = 0) out vec2 out_uv;
//! layout(location = 1) out vec3 out_color;
//! void main() {
//!     gl_Position = vec4(in_pos, 0.0, 1.0);
//!     out_uv = in_uv;
//!     out_color = in_color;
//! }
//!
//! // fragment
//! #version 450
//! layout(location = 0) in vec2 in_uv;
//! layout(location = 1) in vec3 in_color;
//! layout(location = 0) out vec4 out_frag;
//! layout(set = 0, binding = 0) uniform sampler2D font;
//! layout(push_constant) uniform Tint { vec4 tint; };
//! void main() {
//!     float coverage = texture(font, in_uv).r;
//!     out_frag = vec4(in_color * tint.rgb, coverage * tint.a);
//! }
//! ```

pub const OVERLAY_VERT: &[u32] = &[
    0x07230203, 0x00010000, 0x00000000, 0x0000001c, 0x00000000, 0x00020011,
    0x00000001, 0x0003000e, 0x00000000, 0x00000001, 0x000b000f, 0x00000000,
    0x00000001, 0x6e69616d, 0x00000000, 0x00000002, 0x00000003, 0x00000004,
    0x00000005, 0x00000006, 0x00000007, 0x00040047, 0x00000002, 0x0000001e,
    0x00000000, 0x00040047, 0x00000003, 0x0000001e, 0x00000001, 0x00040047,
    0x00000004, 0x0000001e, 0x00000002, 0x00040047, 0x00000005, 0x0000000b,
    0x00000000, 0x00040047, 0x00000006, 0x0000001e, 0x00000000, 0x00040047,
    0x00000007, 0x0000001e, 0x00000001, 0x00020013, 0x00000008, 0x00030021,
    0x00000009, 0x00000008, 0x00030016, 0x0000000a, 0x00000020, 0x00040017,
    0x0000000b, 0x0000000a, 0x00000002, 0x00040017, 0x0000000c, 0x0000000a,
    0x00000003, 0x00040017, 0x0000000d, 0x0000000a, 0x00000004, 0x00040020,
    0x0000000e, 0x00000001, 0x0000000b, 0x00040020, 0x0000000f, 0x00000001,
    0x0000000c, 0x00040020, 0x00000010, 0x00000003, 0x0000000b, 0x00040020,
    0x00000011, 0x00000003, 0x0000000c, 0x00040020, 0x00000012, 0x00000003,
    0x0000000d, 0x0004002b, 0x0000000a, 0x00000013, 0x00000000, 0x0004002b,
    0x0000000a, 0x00000014, 0x3f800000, 0x0004003b, 0x0000000e, 0x00000002,
    0x00000001, 0x0004003b, 0x0000000e, 0x00000003, 0x00000001, 0x0004003b,
    0x0000000f, 0x00000004, 0x00000001, 0x0004003b, 0x00000012, 0x00000005,
    0x00000003, 0x0004003b, 0x00000010, 0x00000006, 0x00000003, 0x0004003b,
    0x00000011, 0x00000007, 0x00000003, 0x00050036, 0x00000008, 0x00000001,
    0x00000000, 0x00000009, 0x000200f8, 0x00000015, 0x0004003d, 0x0000000b,
    0x00000016, 0x00000002, 0x00050051, 0x0000000a, 0x00000017, 0x00000016,
    0x00000000, 0x00050051, 0x0000000a, 0x00000018, 0x00000016, 0x00000001,
    0x00070050, 0x0000000d, 0x00000019, 0x00000017, 0x00000018, 0x00000013,
    0x00000014, 0x0003003e, 0x00000005, 0x00000019, 0x0004003d, 0x0000000b,
    0x0000001a, 0x00000003, 0x0003003e, 0x00000006, 0x0000001a, 0x0004003d,
    0x0000000c, 0x0000001b, 0x00000004, 0x0003003e, 0x00000007, 0x0000001b,
    0x000100fd, 0x00010038,
];

pub const OVERLAY_FRAG: &[u32] = &[
    0x07230203, 0x00010000, 0x00000000, 0x00000028, 0x00000000, 0x00020011,
    0x00000001, 0x0003000e, 0x00000000, 0x00000001, 0x0008000f, 0x00000004,
    0x00000001, 0x6e69616d, 0x00000000, 0x00000002, 0x00000003, 0x00000004,
    0x00030010, 0x00000001, 0x00000007, 0x00040047, 0x00000002, 0x0000001e,
    0x00000000, 0x00040047, 0x00000003, 0x0000001e, 0x00000001, 0x00040047,
    0x00000004, 0x0000001e, 0x00000000, 0x00040047, 0x00000005, 0x00000022,
    0x00000000, 0x00040047, 0x00000005, 0x00000021, 0x00000000, 0x00030047,
    0x00000010, 0x00000002, 0x00050048, 0x00000010, 0x00000000, 0x00000023,
    0x00000000, 0x00020013, 0x00000007, 0x00030021, 0x00000008, 0x00000007,
    0x00030016, 0x00000009, 0x00000020, 0x00040015, 0x0000000a, 0x00000020,
    0x00000001, 0x00040017, 0x0000000b, 0x00000009, 0x00000002, 0x00040017,
    0x0000000c, 0x00000009, 0x00000003, 0x00040017, 0x0000000d, 0x00000009,
    0x00000004, 0x00090019, 0x0000000e, 0x00000009, 0x00000001, 0x00000000,
    0x00000000, 0x00000000, 0x00000001, 0x00000000, 0x0003001b, 0x0000000f,
    0x0000000e, 0x0003001e, 0x00000010, 0x0000000d, 0x00040020, 0x00000011,
    0x00000000, 0x0000000f, 0x00040020, 0x00000012, 0x00000009, 0x00000010,
    0x00040020, 0x00000013, 0x00000009, 0x0000000d, 0x00040020, 0x00000014,
    0x00000001, 0x0000000b, 0x00040020, 0x00000015, 0x00000001, 0x0000000c,
    0x00040020, 0x00000016, 0x00000003, 0x0000000d, 0x0004002b, 0x0000000a,
    0x00000017, 0x00000000, 0x0004003b, 0x00000014, 0x00000002, 0x00000001,
    0x0004003b, 0x00000015, 0x00000003, 0x00000001, 0x0004003b, 0x00000016,
    0x00000004, 0x00000003, 0x0004003b, 0x00000011, 0x00000005, 0x00000000,
    0x0004003b, 0x00000012, 0x00000006, 0x00000009, 0x00050036, 0x00000007,
    0x00000001, 0x00000000, 0x00000008, 0x000200f8, 0x00000018, 0x0004003d,
    0x0000000f, 0x00000019, 0x00000005, 0x0004003d, 0x0000000b, 0x0000001a,
    0x00000002, 0x00050057, 0x0000000d, 0x0000001b, 0x00000019, 0x0000001a,
    0x00050051, 0x00000009, 0x0000001c, 0x0000001b, 0x00000000, 0x00050041,
    0x00000013, 0x0000001d, 0x00000006, 0x00000017, 0x0004003d, 0x0000000d,
    0x0000001e, 0x0000001d, 0x0008004f, 0x0000000c, 0x0000001f, 0x0000001e,
    0x0000001e, 0x00000000, 0x00000001, 0x00000002, 0x0004003d, 0x0000000c,
    0x00000020, 0x00000003, 0x00050085, 0x0000000c, 0x00000021, 0x00000020,
    0x0000001f, 0x00050051, 0x00000009, 0x00000022, 0x0000001e, 0x00000003,
    0x00050085, 0x00000009, 0x00000023, 0x0000001c, 0x00000022, 0x00050051,
    0x00000009, 0x00000024, 0x00000021, 0x00000000, 0x00050051, 0x00000009,
    0x00000025, 0x00000021, 0x00000001, 0x00050051, 0x00000009, 0x00000026,
    0x00000021, 0x00000002, 0x00070050, 0x0000000d, 0x00000027, 0x00000024,
    0x00000025, 0x00000026, 0x00000023, 0x0003003e, 0x00000004, 0x00000027,
    0x000100fd, 0x00010038,
];

