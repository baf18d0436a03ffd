/*!
    Process images and CANopen object dictionary bindings for a fieldbus master.

    The master driver owns an input and an output [ProcessImage] that it synchronizes with the slaves at each cycle, and exposes them through the [MasterLink] trait. The application binds dictionary entries to them with [ProcessDataBinding], [RawBinding] and [ServiceDataBinding], and subscribes to the cycles and the master events on the link's [Hub].
*/

pub mod data;
pub mod dictionary;
pub mod image;
pub mod notify;
pub mod cycle;
pub mod link;
pub mod binding;
pub mod sdo;
pub mod loopback;
pub mod error;

pub use crate::data::{PdoData, PackingError, PackingResult};
pub use crate::dictionary::{ObjectDescriptor, Access, Mapping, TypeCode};
pub use crate::image::{ProcessImage, ImageAccess, MAX_IMAGE_BYTES};
pub use crate::notify::{Hub, Subscriber};
pub use crate::cycle::CycleCounter;
pub use crate::link::*;
pub use crate::binding::*;
pub use crate::sdo::SdoAbortCode;
pub use crate::loopback::{LoopbackMaster, LinkConfig, CycleThread};
pub use crate::error::{MasterError, MasterResult, ErrorKind};
