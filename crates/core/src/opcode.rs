//! The bytecode instruction catalogue
//!
//! Every instruction is a one-byte opcode followed by 0-3 operand bytes;
//! the operand shape is fixed per opcode. Opcodes that address the
//! constants pool or carry an index operand come in pairs: the short form
//! takes a single byte, the `*_LONG` sibling a 24-bit big-endian operand.
//! The compiler emits the short form whenever the index fits.

/// Operand shape of an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operands {
    /// No operand bytes.
    None,
    /// One unsigned byte (stack depth, argument count, slot).
    Byte,
    /// Three bytes, big-endian unsigned (the `*_LONG` operand forms).
    Wide,
    /// One-byte index into the constants pool.
    Constant,
    /// Three-byte big-endian index into the constants pool.
    ConstantWide,
    /// Two-byte big-endian forward displacement.
    Jump,
    /// Two-byte big-endian backward displacement (subtracted).
    JumpBack,
}

impl Operands {
    /// Operand bytes following the opcode. `OP_CLOSURE`'s capture trailer
    /// is not included; its length depends on the target function.
    pub fn size(self) -> usize {
        match self {
            Operands::None => 0,
            Operands::Byte | Operands::Constant => 1,
            Operands::Jump | Operands::JumpBack => 2,
            Operands::Wide | Operands::ConstantWide => 3,
        }
    }
}

macro_rules! opcodes {
    ($($variant:ident = $name:literal => $operands:expr;)*) => {
        /// One instruction opcode. Discriminants are the wire encoding.
        #[repr(u8)]
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum Op {
            $($variant),*
        }

        impl Op {
            /// Every defined opcode, in encoding order.
            pub const ALL: &'static [Op] = &[$(Op::$variant),*];

            /// Decode one opcode byte. `None` for undefined encodings; the
            /// disassembler reports those and resynchronizes one byte on.
            pub fn from_byte(byte: u8) -> Option<Op> {
                match byte {
                    $(b if b == Op::$variant as u8 => Some(Op::$variant),)*
                    _ => None,
                }
            }

            /// Name used in disassembly listings.
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => $name),*
                }
            }

            /// Operand shape of this opcode.
            pub fn operands(self) -> Operands {
                match self {
                    $(Op::$variant => $operands),*
                }
            }
        }
    };
}

opcodes! {
    // Calls and returns
    Return = "OP_RETURN" => Operands::None;
    Call = "OP_CALL" => Operands::Byte;
    CallLong = "OP_CALL_LONG" => Operands::Wide;
    CallStack = "OP_CALL_STACK" => Operands::None;
    Kwargs = "OP_KWARGS" => Operands::Byte;
    KwargsLong = "OP_KWARGS_LONG" => Operands::Wide;
    ExpandArgs = "OP_EXPAND_ARGS" => Operands::Byte;

    // Arithmetic and comparison
    Add = "OP_ADD" => Operands::None;
    Subtract = "OP_SUBTRACT" => Operands::None;
    Multiply = "OP_MULTIPLY" => Operands::None;
    Divide = "OP_DIVIDE" => Operands::None;
    Modulo = "OP_MODULO" => Operands::None;
    Negate = "OP_NEGATE" => Operands::None;
    Equal = "OP_EQUAL" => Operands::None;
    Greater = "OP_GREATER" => Operands::None;
    Less = "OP_LESS" => Operands::None;
    Not = "OP_NOT" => Operands::None;
    BitOr = "OP_BITOR" => Operands::None;
    BitXor = "OP_BITXOR" => Operands::None;
    BitAnd = "OP_BITAND" => Operands::None;
    ShiftLeft = "OP_SHIFTLEFT" => Operands::None;
    ShiftRight = "OP_SHIFTRIGHT" => Operands::None;
    BitNegate = "OP_BITNEGATE" => Operands::None;

    // Literals
    None = "OP_NONE" => Operands::None;
    True = "OP_TRUE" => Operands::None;
    False = "OP_FALSE" => Operands::None;
    Constant = "OP_CONSTANT" => Operands::Constant;
    ConstantLong = "OP_CONSTANT_LONG" => Operands::ConstantWide;

    // Stack shuffling
    Pop = "OP_POP" => Operands::None;
    Swap = "OP_SWAP" => Operands::None;
    Dup = "OP_DUP" => Operands::Byte;

    // Globals (operand names the symbol in the constants pool)
    DefineGlobal = "OP_DEFINE_GLOBAL" => Operands::Constant;
    DefineGlobalLong = "OP_DEFINE_GLOBAL_LONG" => Operands::ConstantWide;
    GetGlobal = "OP_GET_GLOBAL" => Operands::Constant;
    GetGlobalLong = "OP_GET_GLOBAL_LONG" => Operands::ConstantWide;
    SetGlobal = "OP_SET_GLOBAL" => Operands::Constant;
    SetGlobalLong = "OP_SET_GLOBAL_LONG" => Operands::ConstantWide;

    // Locals and upvalues (operand is a slot / upvalue index)
    GetLocal = "OP_GET_LOCAL" => Operands::Byte;
    GetLocalLong = "OP_GET_LOCAL_LONG" => Operands::Wide;
    SetLocal = "OP_SET_LOCAL" => Operands::Byte;
    SetLocalLong = "OP_SET_LOCAL_LONG" => Operands::Wide;
    GetUpvalue = "OP_GET_UPVALUE" => Operands::Byte;
    GetUpvalueLong = "OP_GET_UPVALUE_LONG" => Operands::Wide;
    SetUpvalue = "OP_SET_UPVALUE" => Operands::Byte;
    SetUpvalueLong = "OP_SET_UPVALUE_LONG" => Operands::Wide;
    Inc = "OP_INC" => Operands::Byte;
    IncLong = "OP_INC_LONG" => Operands::Wide;

    // Control flow (16-bit displacement; Loop subtracts)
    Jump = "OP_JUMP" => Operands::Jump;
    JumpIfFalse = "OP_JUMP_IF_FALSE" => Operands::Jump;
    JumpIfTrue = "OP_JUMP_IF_TRUE" => Operands::Jump;
    Loop = "OP_LOOP" => Operands::JumpBack;
    PushTry = "OP_PUSH_TRY" => Operands::Jump;

    // Classes and instances
    Class = "OP_CLASS" => Operands::Constant;
    ClassLong = "OP_CLASS_LONG" => Operands::ConstantWide;
    Method = "OP_METHOD" => Operands::Constant;
    MethodLong = "OP_METHOD_LONG" => Operands::ConstantWide;
    Inherit = "OP_INHERIT" => Operands::None;
    GetProperty = "OP_GET_PROPERTY" => Operands::Constant;
    GetPropertyLong = "OP_GET_PROPERTY_LONG" => Operands::ConstantWide;
    SetProperty = "OP_SET_PROPERTY" => Operands::Constant;
    SetPropertyLong = "OP_SET_PROPERTY_LONG" => Operands::ConstantWide;
    GetSuper = "OP_GET_SUPER" => Operands::Constant;
    GetSuperLong = "OP_GET_SUPER_LONG" => Operands::ConstantWide;
    InvokeGetter = "OP_INVOKE_GETTER" => Operands::None;
    InvokeSetter = "OP_INVOKE_SETTER" => Operands::None;
    InvokeGetSlice = "OP_INVOKE_GETSLICE" => Operands::None;
    Docstring = "OP_DOCSTRING" => Operands::None;
    Finalize = "OP_FINALIZE" => Operands::None;

    // Closures (OP_CLOSURE is followed by one (is_local, index) byte pair
    // per captured variable; the pair count comes from the function)
    Closure = "OP_CLOSURE" => Operands::Constant;
    ClosureLong = "OP_CLOSURE_LONG" => Operands::ConstantWide;
    CloseUpvalue = "OP_CLOSE_UPVALUE" => Operands::None;

    // Misc
    Raise = "OP_RAISE" => Operands::None;
    Import = "OP_IMPORT" => Operands::Constant;
    ImportLong = "OP_IMPORT_LONG" => Operands::ConstantWide;
}
