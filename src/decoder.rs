use crate::opcodes::{self, Opcode};

/// One decoded instruction: its opcode, byte offset in the raw code, and
/// captured PUSH immediate.
#[derive(Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub offset: usize,
    pub immediate: Option<Vec<u8>>,
}

/// Pre-decoded bytecode. The program counter indexes `instructions`;
/// `jumpdests` maps the byte offset of every JUMPDEST outside a PUSH
/// immediate back to its instruction index, which makes jump validation a
/// lookup. Decoded once per distinct code hash and shared between frames.
#[derive(Debug, Default)]
pub struct Bytecode {
    pub raw: Vec<u8>,
    pub instructions: Vec<Instruction>,
    jumpdests: Vec<(usize, usize)>,
}

impl Bytecode {
    pub fn decode(code: &[u8]) -> Self {
        let mut instructions = Vec::new();
        let mut jumpdests = Vec::new();

        let mut pos = 0;
        while pos < code.len() {
            let opcode = opcodes::opcode(code[pos]);
            if opcode.byte == opcodes::JUMPDEST {
                jumpdests.push((pos, instructions.len()));
            }

            let offset = pos;
            pos += 1;

            let width = opcode.immediate_len();
            let immediate = if width > 0 {
                // a PUSH running past the end of code reads zeros
                let mut arg = vec![0u8; width];
                let available = width.min(code.len() - pos);
                arg[..available].copy_from_slice(&code[pos..pos + available]);
                pos += width;
                Some(arg)
            } else {
                None
            };

            instructions.push(Instruction {
                opcode,
                offset,
                immediate,
            });
        }

        Self {
            raw: code.to_vec(),
            instructions,
            jumpdests,
        }
    }

    /// Resolve a byte offset to the instruction index of a JUMPDEST there.
    /// `None` for anything else, including JUMPDEST bytes buried inside a
    /// PUSH immediate.
    pub fn jump_target(&self, offset: usize) -> Option<usize> {
        let index = self
            .jumpdests
            .binary_search_by_key(&offset, |(position, _)| *position)
            .ok()?;
        Some(self.jumpdests[index].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_immediates() {
        // PUSH2 0x0102, ADD, PUSH1 0x05
        let code = Bytecode::decode(&[0x61, 0x01, 0x02, 0x01, 0x60, 0x05]);
        assert_eq!(code.instructions.len(), 3);
        assert_eq!(code.instructions[0].immediate, Some(vec![0x01, 0x02]));
        assert_eq!(code.instructions[1].offset, 3);
        assert_eq!(code.instructions[1].immediate, None);
        assert_eq!(code.instructions[2].offset, 4);
    }

    #[test]
    fn test_truncated_push_is_zero_padded() {
        // PUSH3 with a single trailing byte
        let code = Bytecode::decode(&[0x62, 0xaa]);
        assert_eq!(code.instructions.len(), 1);
        assert_eq!(code.instructions[0].immediate, Some(vec![0xaa, 0x00, 0x00]));
    }

    #[test]
    fn test_jumpdest_inside_push_is_not_a_target() {
        // PUSH1 0x5b, JUMPDEST
        let code = Bytecode::decode(&[0x60, 0x5b, 0x5b]);
        assert_eq!(code.jump_target(1), None);
        assert_eq!(code.jump_target(2), Some(1));
        assert_eq!(code.jump_target(0), None);
    }
}
