//! 外部协作服务
//!
//! 每个协作方都是一个 trait，附带一个可运行的默认实现：
//!
//! | Trait | 默认实现 |
//! |-------|----------|
//! | [`Catalog`] | [`InMemoryCatalog`] |
//! | [`BlobStore`] | [`LocalBlobStore`] |
//! | [`VoucherValidator`] | [`VoucherRegistry`] |
//! | [`DeliveryFeeLookup`] | [`ZoneFeeTable`] |
//! | [`InquiryNotifier`] | [`WebhookNotifier`] / [`LogNotifier`] |

pub mod blob_store;
pub mod catalog;
pub mod delivery_fee;
pub mod notification;
pub mod vouchers;

pub use blob_store::{BlobError, BlobStore, LocalBlobStore, UploadTicket};
pub use catalog::{Catalog, CatalogError, InMemoryCatalog, Menu, MenuItem};
pub use delivery_fee::{DeliveryFeeLookup, ZoneFeeTable};
pub use notification::{Inquiry, InquiryNotifier, LogNotifier, WebhookNotifier};
pub use vouchers::{VoucherError, VoucherRegistry, VoucherValidator};
