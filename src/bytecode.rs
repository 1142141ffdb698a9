// ABOUTME: Bytecode top-level loader — header parsing, version check, byte-swap
//
// Grounded in `original_source/parser.c`'s `read_file_common` (the
// `compiled` branch), `read_compiled_file` (§4.H). This crate has no VM of
// its own, so executing a descriptor is delegated to a `VmHost`
// implementation the embedder supplies.

use crate::error::BytecodeError;
use crate::value::Value;

/// A single top-level procedure descriptor read from a compiled form:
/// `(nlevels nregs bytecode datavec . funvec)`.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub nlevels: i64,
    pub nregs: i64,
    pub bytecode: Vec<u8>,
    pub datavec: Value,
    pub funvec: Value,
}

/// The external collaborator seam: whatever runtime owns bytecode
/// execution implements this so the loader can hand off each descriptor
/// without needing to know how to run it.
pub trait VmHost {
    fn execute_toplevel(&mut self, desc: &Descriptor) -> Result<(), BytecodeError>;
}

fn this_machine_is_little_endian() -> bool {
    cfg!(target_endian = "little")
}

fn swap_bytecode_words(bytecode: &mut [u8]) {
    for chunk in bytecode.chunks_exact_mut(4) {
        chunk.swap(0, 3);
        chunk.swap(1, 2);
    }
}

fn as_list(v: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    let mut cur = v.clone();
    loop {
        match cur {
            Value::Cons(cell) => {
                let (car, cdr) = cell.borrow().clone();
                out.push(car);
                cur = cdr;
            }
            _ => break,
        }
    }
    out
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => Some(*n as i64),
        _ => None,
    }
}

fn as_buf(v: &Value) -> Option<Vec<u8>> {
    match v {
        Value::Buf(b) => Some(b.borrow().clone()),
        _ => None,
    }
}

fn parse_descriptor(name: &str, item: &Value) -> Result<Descriptor, BytecodeError> {
    let parts = as_list(item);
    if parts.len() < 5 {
        return Err(BytecodeError::MalformedDescriptor {
            name: name.to_string(),
        });
    }
    let nlevels = as_i64(&parts[0]).ok_or_else(|| BytecodeError::MalformedDescriptor {
        name: name.to_string(),
    })?;
    let nregs = as_i64(&parts[1]).ok_or_else(|| BytecodeError::MalformedDescriptor {
        name: name.to_string(),
    })?;
    let bytecode = as_buf(&parts[2]).ok_or_else(|| BytecodeError::MalformedDescriptor {
        name: name.to_string(),
    })?;
    let datavec = parts[3].clone();
    let funvec = parts[4].clone();

    Ok(Descriptor {
        nlevels,
        nregs,
        bytecode,
        datavec,
        funvec,
    })
}

/// Read every top-level compiled form from `forms` (already read and
/// circ-resolved by the parser), validate the header, byte-swap each
/// descriptor's bytecode when the file's endianness disagrees with this
/// machine's, and hand each descriptor to `host`.
///
/// The first form is the header `(major minor big-endian-flag)`; every
/// subsequent form is a list of descriptors.
pub fn load_compiled(
    name: &str,
    forms: &[Value],
    host: &mut dyn VmHost,
) -> Result<(), BytecodeError> {
    let mut forms = forms.iter();

    let header = forms.next().ok_or_else(|| BytecodeError::MalformedHeader {
        name: name.to_string(),
    })?;
    let header_parts = as_list(header);
    if header_parts.len() < 3 {
        return Err(BytecodeError::MalformedHeader {
            name: name.to_string(),
        });
    }
    let major = as_i64(&header_parts[0]).ok_or_else(|| BytecodeError::MalformedHeader {
        name: name.to_string(),
    })?;
    if !(1..=2).contains(&major) {
        return Err(BytecodeError::VersionMismatch {
            name: name.to_string(),
        });
    }
    let big_endian = !matches!(header_parts[2], Value::Bool(false) | Value::Nil);

    for form in forms {
        for item in as_list(form) {
            let mut desc = parse_descriptor(name, &item)?;
            if big_endian == this_machine_is_little_endian() {
                swap_bytecode_words(&mut desc.bytecode);
            }
            host.execute_toplevel(&desc)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingHost {
        executed: Vec<Vec<u8>>,
    }

    impl VmHost for RecordingHost {
        fn execute_toplevel(&mut self, desc: &Descriptor) -> Result<(), BytecodeError> {
            self.executed.push(desc.bytecode.clone());
            Ok(())
        }
    }

    fn descriptor_form(bytecode: Vec<u8>) -> Value {
        Value::list(vec![
            Value::Number(1.0),
            Value::Number(4.0),
            Value::Buf(Rc::new(RefCell::new(bytecode))),
            Value::Nil,
            Value::Nil,
        ])
    }

    #[test]
    fn test_load_compiled_version_mismatch() {
        let header = Value::list(vec![Value::Number(99.0), Value::Number(0.0), Value::Bool(false)]);
        let mut host = RecordingHost { executed: vec![] };
        let err = load_compiled("test.tlo", &[header], &mut host).unwrap_err();
        assert!(matches!(err, BytecodeError::VersionMismatch { .. }));
    }

    #[test]
    fn test_load_compiled_executes_descriptors() {
        let header = Value::list(vec![Value::Number(1.0), Value::Number(0.0), Value::Bool(false)]);
        let body = Value::list(vec![descriptor_form(vec![1, 2, 3, 4])]);
        let mut host = RecordingHost { executed: vec![] };
        load_compiled("test.tlo", &[header, body], &mut host).unwrap();
        assert_eq!(host.executed.len(), 1);
    }

    #[test]
    fn test_swap_bytecode_words() {
        let mut bytes = vec![1u8, 2, 3, 4];
        swap_bytecode_words(&mut bytes);
        assert_eq!(bytes, vec![4, 3, 2, 1]);
    }
}
