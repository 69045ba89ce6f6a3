use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::FunctionObj;
use crate::gc::ValueRef;
use crate::limits::INSTANCE_FIELD_CAP;
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct ClassObj {
    pub name: Rc<str>,
    pub superclass: Option<ValueRef>,
    pub methods: Rc<Vec<(Rc<str>, FunctionObj)>>,
}

impl ClassObj {
    /// Looks up a method by name, walking the superclass chain. `heap` is
    /// needed to follow `superclass` handles past the first link.
    pub fn find_method(&self, heap: &crate::gc::Heap, name: &str) -> Option<FunctionObj> {
        if let Some((_, m)) = self.methods.iter().find(|(n, _)| n.as_ref() == name) {
            return Some(m.clone());
        }
        match self.superclass {
            Some(sup) => match heap.get(sup) {
                crate::gc::RawValue::Class(sup_class) => sup_class.find_method(heap, name),
                _ => None,
            },
            None => None,
        }
    }
}

impl fmt::Display for ClassObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct InstanceObj {
    pub class: ValueRef,
    pub fields: Vec<(Rc<str>, ValueRef)>,
}

impl InstanceObj {
    pub fn get(&self, heap: &crate::gc::Heap, name: &Token) -> Option<GetResult> {
        if let Some((_, v)) = self.fields.iter().find(|(n, _)| n.as_ref() == name.lexeme) {
            return Some(GetResult::Field(*v));
        }
        let crate::gc::RawValue::Class(class) = heap.get(self.class) else {
            unreachable!("instance's class handle must resolve to a class value");
        };
        class.find_method(heap, &name.lexeme).map(GetResult::Method)
    }

    pub fn set(&mut self, name: &Token, value: ValueRef) -> Result<(), RuntimeError> {
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| n.as_ref() == name.lexeme) {
            slot.1 = value;
            return Ok(());
        }
        if self.fields.len() >= INSTANCE_FIELD_CAP {
            return Err(RuntimeError::new(name.clone(), "Too many fields on instance."));
        }
        self.fields.push((Rc::from(name.lexeme.as_str()), value));
        Ok(())
    }
}

pub enum GetResult {
    Field(ValueRef),
    Method(FunctionObj),
}
