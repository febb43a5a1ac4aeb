//! Allocates and indexes into an `XSQLDA`, whose C definition ends in a flexible array
//! member (`XSQLVAR sqlvar[1]`) sized at allocation time. `sys::XSQLDA` only models the
//! fixed header; this module owns the raw allocation and the pointer arithmetic the
//! flexible member implies.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::os::raw::c_short;

use crate::sys::{SQLDA_VERSION1, XSQLDA, XSQLVAR};

/// An owned, heap-allocated `XSQLDA` sized to hold `count` `XSQLVAR` slots.
pub struct XsqlDa {
    ptr: *mut XSQLDA,
    count: usize,
    layout: Layout,
}

unsafe impl Send for XsqlDa {}

fn layout_for(count: usize) -> Layout {
    let header = std::mem::size_of::<XSQLDA>();
    let vars = std::mem::size_of::<XSQLVAR>() * count;
    Layout::from_size_align(header + vars, std::mem::align_of::<XSQLDA>()).expect("xsqlda layout never overflows")
}

impl XsqlDa {
    /// Allocates room for at least one variable — `isc_dsql_describe` needs a non-null
    /// XSQLDA even to report that a statement produces zero columns.
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        let layout = layout_for(count);
        let ptr = unsafe { alloc_zeroed(layout) } as *mut XSQLDA;
        assert!(!ptr.is_null(), "xsqlda allocation failed");
        unsafe {
            (*ptr).version = SQLDA_VERSION1;
            (*ptr).sqln = count as c_short;
        }
        XsqlDa { ptr, count, layout }
    }

    pub fn as_ptr(&self) -> *mut XSQLDA {
        self.ptr
    }

    /// How many variables the server described (may be less than [`Self::capacity`]
    /// if this XSQLDA was allocated oversized, or more if it needs to be reallocated
    /// and re-described).
    pub fn described_count(&self) -> i16 {
        unsafe { (*self.ptr).sqld }
    }

    pub fn capacity(&self) -> usize {
        self.count
    }

    /// Pointer to the `index`th `XSQLVAR` slot. Panics on out-of-range `index` — this
    /// is an internal invariant bug, not a caller input error, since every caller
    /// derives `index` from `described_count`/`capacity`.
    pub fn var(&self, index: usize) -> *mut XSQLVAR {
        assert!(index < self.count, "xsqlvar index {index} out of bounds ({})", self.count);
        let header = std::mem::size_of::<XSQLDA>();
        let var_size = std::mem::size_of::<XSQLVAR>();
        unsafe { (self.ptr as *mut u8).add(header + index * var_size) as *mut XSQLVAR }
    }
}

impl Drop for XsqlDa {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr as *mut u8, self.layout) };
    }
}

/// The display name Firebird reports for a described column: the query alias
/// (`aliasname`) if the server set one, falling back to the underlying column's own
/// name (`sqlname`) otherwise — matching `ResultSet::column_name`'s "alias-preferred"
/// contract.
pub fn column_name(var: *const XSQLVAR) -> String {
    unsafe {
        let alias_len = (*var).aliasname_length as usize;
        if alias_len > 0 {
            String::from_utf8_lossy(&(*var).aliasname[..alias_len]).into_owned()
        } else {
            let name_len = (*var).sqlname_length as usize;
            String::from_utf8_lossy(&(*var).sqlname[..name_len]).into_owned()
        }
    }
}

/// The data buffer size this driver allocates for a described `XSQLVAR`: the server's
/// `sqllen` for every fixed-width type, plus the 2-byte length prefix `SQL_VARYING`
/// needs on top of its declared character length.
pub fn buffer_size_for(sqltype: c_short, sqllen: c_short) -> usize {
    if sqltype == crate::sys::SQL_VARYING {
        sqllen as usize + 2
    } else {
        sqllen.max(1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_requested_capacity() {
        let da = XsqlDa::new(3);
        assert_eq!(da.capacity(), 3);
        unsafe {
            assert_eq!((*da.as_ptr()).sqln, 3);
            assert_eq!((*da.as_ptr()).version, SQLDA_VERSION1);
        }
    }

    #[test]
    fn var_pointers_are_distinct_and_in_range() {
        let da = XsqlDa::new(4);
        let mut pointers = Vec::new();
        for i in 0..4 {
            pointers.push(da.var(i) as usize);
        }
        pointers.sort_unstable();
        pointers.dedup();
        assert_eq!(pointers.len(), 4);
    }

    #[test]
    fn zero_requested_count_still_allocates_one_slot() {
        let da = XsqlDa::new(0);
        assert_eq!(da.capacity(), 1);
    }
}
