//! Hand-written bindings to the subset of the Firebird client API (`isc_*`/`fb_*`) this
//! driver needs, linked via `build.rs`'s `cargo:rustc-link-lib=dylib=fbclient`.
//!
//! Modelled on the C `ibase.h` surface: status vectors are a fixed-size array the
//! client library fills in on every call (first element nonzero means "look at the
//! rest"), and `isc_db_handle`/`isc_tr_handle`/`isc_stmt_handle` are opaque 32-bit
//! handles the client library maps internally — not real pointers, even on 64-bit
//! platforms, which is why they stay `u32` rather than growing with the pointer width.
#![allow(non_camel_case_types, non_upper_case_globals, dead_code)]

use libc::{c_char, c_short, c_void};

pub type ISC_STATUS = isize;
pub const ISC_STATUS_LENGTH: usize = 20;
pub type ISC_STATUS_ARRAY = [ISC_STATUS; ISC_STATUS_LENGTH];

pub type isc_db_handle = u32;
pub type isc_tr_handle = u32;
pub type isc_stmt_handle = u32;
pub type isc_blob_handle = u32;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ISC_QUAD {
    pub gds_quad_high: i32,
    pub gds_quad_low: u32,
}

/// One bound/described column or parameter slot. `sqldata`/`sqlind` point into a
/// buffer the caller owns and must keep alive for as long as the XSQLDA does.
#[repr(C)]
pub struct XSQLVAR {
    pub sqltype: c_short,
    pub sqlscale: c_short,
    pub sqlsubtype: c_short,
    pub sqllen: c_short,
    pub sqldata: *mut c_char,
    pub sqlind: *mut c_short,
    pub sqlname_length: c_short,
    pub sqlname: [u8; 32],
    pub relname_length: c_short,
    pub relname: [u8; 32],
    pub ownname_length: c_short,
    pub ownname: [u8; 32],
    pub aliasname_length: c_short,
    pub aliasname: [u8; 32],
}

/// The fixed header of an XSQLDA. The real struct ends in a C99 flexible array member
/// (`XSQLVAR sqlvar[1]`) sized at allocation time to hold `sqln` variables; see
/// `xsqlda.rs` for the allocation and per-slot-pointer arithmetic this implies.
#[repr(C)]
pub struct XSQLDA {
    pub version: c_short,
    pub sqldaid: [u8; 8],
    pub sqldabc: i32,
    pub sqln: c_short,
    pub sqld: c_short,
}

pub const SQLDA_VERSION1: c_short = 1;

pub const SQL_TEXT: c_short = 452;
pub const SQL_VARYING: c_short = 448;
pub const SQL_SHORT: c_short = 500;
pub const SQL_LONG: c_short = 496;
pub const SQL_FLOAT: c_short = 482;
pub const SQL_DOUBLE: c_short = 480;
pub const SQL_D_FLOAT: c_short = 530;
pub const SQL_TIMESTAMP: c_short = 510;
pub const SQL_BLOB: c_short = 520;
pub const SQL_TYPE_TIME: c_short = 560;
pub const SQL_TYPE_DATE: c_short = 570;
pub const SQL_INT64: c_short = 580;
pub const SQL_BOOLEAN: c_short = 32764;

pub const DSQL_close: u16 = 1;
pub const DSQL_drop: u16 = 2;
pub const DSQL_unprepare: u16 = 4;

/// `isc_dsql_fetch` returns this (not via the status vector) once the cursor is
/// exhausted.
pub const SQL_NO_DATA: ISC_STATUS = 100;

/// `isc_get_segment`'s own return value (not the status vector) once a blob has been
/// read to completion.
pub const ISC_SEGSTR_EOF: ISC_STATUS = 335740008;
/// `isc_get_segment`'s own return value when the segment was larger than the buffer
/// passed in — the caller got a full buffer's worth and should call again for the
/// rest of that same segment.
pub const ISC_SEGMENT: ISC_STATUS = 335740005;

// `isc_dsql_sql_info` request/response item codes (the "records" cluster), used to
// recover the affected-row count after `isc_dsql_execute`.
pub const ISC_INFO_SQL_RECORDS: u8 = 21;
pub const ISC_INFO_END: u8 = 1;
pub const ISC_INFO_REQ_SELECT_COUNT: u8 = 13;
pub const ISC_INFO_REQ_INSERT_COUNT: u8 = 14;
pub const ISC_INFO_REQ_UPDATE_COUNT: u8 = 15;
pub const ISC_INFO_REQ_DELETE_COUNT: u8 = 16;

extern "C" {
    pub fn isc_attach_database(
        status: *mut ISC_STATUS,
        db_name_length: c_short,
        db_name: *const c_char,
        db_handle: *mut isc_db_handle,
        parm_buffer_length: c_short,
        parm_buffer: *const c_char,
    ) -> ISC_STATUS;

    pub fn isc_create_database(
        status: *mut ISC_STATUS,
        db_name_length: c_short,
        db_name: *const c_char,
        db_handle: *mut isc_db_handle,
        parm_buffer_length: c_short,
        parm_buffer: *const c_char,
        db_type: c_short,
    ) -> ISC_STATUS;

    pub fn isc_detach_database(status: *mut ISC_STATUS, db_handle: *mut isc_db_handle) -> ISC_STATUS;

    pub fn isc_start_transaction(
        status: *mut ISC_STATUS,
        tra_handle: *mut isc_tr_handle,
        db_count: c_short,
        ...
    ) -> ISC_STATUS;

    pub fn isc_commit_transaction(status: *mut ISC_STATUS, tra_handle: *mut isc_tr_handle) -> ISC_STATUS;

    pub fn isc_rollback_transaction(status: *mut ISC_STATUS, tra_handle: *mut isc_tr_handle) -> ISC_STATUS;

    pub fn isc_dsql_allocate_statement(
        status: *mut ISC_STATUS,
        db_handle: *mut isc_db_handle,
        stmt_handle: *mut isc_stmt_handle,
    ) -> ISC_STATUS;

    pub fn isc_dsql_prepare(
        status: *mut ISC_STATUS,
        tra_handle: *mut isc_tr_handle,
        stmt_handle: *mut isc_stmt_handle,
        length: u16,
        sql: *const c_char,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_describe(
        status: *mut ISC_STATUS,
        stmt_handle: *mut isc_stmt_handle,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_describe_bind(
        status: *mut ISC_STATUS,
        stmt_handle: *mut isc_stmt_handle,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_execute(
        status: *mut ISC_STATUS,
        tra_handle: *mut isc_tr_handle,
        stmt_handle: *mut isc_stmt_handle,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_execute_immediate(
        status: *mut ISC_STATUS,
        db_handle: *mut isc_db_handle,
        tra_handle: *mut isc_tr_handle,
        length: u16,
        sql: *const c_char,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_fetch(
        status: *mut ISC_STATUS,
        stmt_handle: *mut isc_stmt_handle,
        dialect: u16,
        xsqlda: *mut XSQLDA,
    ) -> ISC_STATUS;

    pub fn isc_dsql_free_statement(
        status: *mut ISC_STATUS,
        stmt_handle: *mut isc_stmt_handle,
        option: u16,
    ) -> ISC_STATUS;

    pub fn isc_dsql_sql_info(
        status: *mut ISC_STATUS,
        stmt_handle: *mut isc_stmt_handle,
        item_length: c_short,
        items: *const c_char,
        buffer_length: c_short,
        buffer: *mut c_char,
    ) -> ISC_STATUS;

    pub fn isc_create_blob2(
        status: *mut ISC_STATUS,
        db_handle: *mut isc_db_handle,
        tra_handle: *mut isc_tr_handle,
        blob_handle: *mut isc_blob_handle,
        blob_id: *mut ISC_QUAD,
        bpb_length: c_short,
        bpb: *const c_char,
    ) -> ISC_STATUS;

    pub fn isc_open_blob2(
        status: *mut ISC_STATUS,
        db_handle: *mut isc_db_handle,
        tra_handle: *mut isc_tr_handle,
        blob_handle: *mut isc_blob_handle,
        blob_id: *mut ISC_QUAD,
        bpb_length: c_short,
        bpb: *const c_char,
    ) -> ISC_STATUS;

    pub fn isc_get_segment(
        status: *mut ISC_STATUS,
        blob_handle: *mut isc_blob_handle,
        actual_length: *mut u16,
        buffer_length: u16,
        buffer: *mut c_char,
    ) -> ISC_STATUS;

    pub fn isc_put_segment(
        status: *mut ISC_STATUS,
        blob_handle: *mut isc_blob_handle,
        length: u16,
        buffer: *const c_char,
    ) -> ISC_STATUS;

    pub fn isc_close_blob(status: *mut ISC_STATUS, blob_handle: *mut isc_blob_handle) -> ISC_STATUS;

    pub fn isc_sqlcode(status: *const ISC_STATUS) -> i32;

    pub fn isc_sql_interprete(sqlcode: c_short, buffer: *mut c_char, buffer_length: c_short);

    pub fn fb_interpret(buffer: *mut c_char, buffer_length: u32, status: *mut *const ISC_STATUS) -> isize;

    /// Unused directly by this driver but linked in by every fbclient build; kept here
    /// as documentation of what else lives in the library, not dead-code bait.
    pub fn isc_free(block: *mut c_void) -> isc_db_handle;
}
