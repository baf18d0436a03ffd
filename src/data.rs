//! Traits and impls used to read/write typed values to/from a process image.

use crate::dictionary::TypeCode;

#[cfg(not(target_endian = "little"))]
compile_error!("process images are little-endian, big-endian hosts would silently mis-decode multi-byte fields");

/**
	trait for data types that can be packed/unpacked to/from a process image or an SDO exchange

	values are always packed in little-endian, which is both the CANopen wire order and the host order (other hosts are refused at compile time)
*/
pub trait PdoData: Sized + Copy {
    /// CANopen type of the value, this is metadata only and never checked against the dictionary
    const TYPE: TypeCode;
    /// number of bits requested when transfering this value through a PDO
    const BITS: usize = Self::Packed::LEN * 8;
    type Packed: Storage;

    fn pack(&self, dst: &mut [u8]) -> PackingResult<()>;
    fn unpack(src: &[u8]) -> PackingResult<Self>;
    /**
        value given by PDO reads that could not transfer or unpack anything

        this is zero for numbers, types with no valid zero pattern must pick one of their values
    */
    fn fallback() -> Self;

    fn packed_size() -> usize  {Self::Packed::LEN}
    fn packed_bitsize() -> usize {Self::Packed::LEN*8}
}

/** Enum to identify packing errors raised by this package
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PackingError {
    BadSize(usize, &'static str),
    InvalidValue(&'static str),
}

pub type PackingResult<T> = Result<T, PackingError>;


/// fixed size byte buffer able to hold a packed [PdoData], this is an equivalent to `packed_struct::ByteArray` with a zeroed constructor
pub trait Storage: AsRef<[u8]> + AsMut<[u8]> {
    const LEN: usize;
    fn zeroed() -> Self;
}
impl<const N: usize> Storage for [u8; N] {
    const LEN: usize = N;
    fn zeroed() -> Self {[0; N]}
}

impl<const N: usize> PdoData for [u8; N] {
	const TYPE: TypeCode = TypeCode::OctetString;
	type Packed = Self;

	fn pack(&self, dst: &mut [u8]) -> PackingResult<()> {
        if dst.len() < N
            {return Err(PackingError::BadSize(dst.len(), "not enough bytes for byte array"))}
        dst[.. N].copy_from_slice(self);
        Ok(())
    }
	fn unpack(src: &[u8]) -> PackingResult<Self>  {
        if src.len() < N
            {return Err(PackingError::BadSize(src.len(), "not enough bytes for desired slice"))}
        let mut value = [0; N];
        value.copy_from_slice(&src[.. N]);
		Ok(value)
	}
	fn fallback() -> Self  {[0; N]}
}

/// booleans take one byte once packed, but only request one bit on the process image
impl PdoData for bool {
	const TYPE: TypeCode = TypeCode::Boolean;
	const BITS: usize = 1;
	type Packed = [u8; 1];

	fn pack(&self, dst: &mut [u8]) -> PackingResult<()>  {
        if dst.len() < Self::Packed::LEN
            {return Err(PackingError::BadSize(dst.len(), "no byte for boolean"))}
        dst[0] = if *self {0b1} else {0b0};
        Ok(())
	}
	fn unpack(src: &[u8]) -> PackingResult<Self>  {
        if src.len() < Self::Packed::LEN
            {return Err(PackingError::BadSize(src.len(), "no byte for boolean"))}
		Ok(src[0] & 0b1 == 0b1)
	}
	fn fallback() -> Self  {false}
}

/**
    macro implementing [PdoData] for a given struct generated with `bilge`

    this is the way to bind device-profile words (status words, control words, banks of flags) as a whole. `$id` is the byte-exact integer the struct is converted from and to, so the struct must derive `FromBits`
*/
#[macro_export]
macro_rules! bilge_pdodata {
    ($t: ty, $id: ty) => { impl $crate::data::PdoData for $t {
        const TYPE: $crate::dictionary::TypeCode = <$id as $crate::data::PdoData>::TYPE;
        type Packed = [u8; core::mem::size_of::<$id>()];

        fn pack(&self, dst: &mut [u8]) -> $crate::data::PackingResult<()> {
            <$id as $crate::data::PdoData>::pack(&<$id>::from(*self), dst)
        }
        fn unpack(src: &[u8]) -> $crate::data::PackingResult<Self> {
            <$id as $crate::data::PdoData>::unpack(src).map(Self::from)
        }
        fn fallback() -> Self {
            Self::from(<$id as $crate::data::PdoData>::fallback())
        }
    }};
}

/// macro implementing [PdoData] for numeric types
macro_rules! num_pdodata {
	($t: ty, $id: ident) => { impl PdoData for $t {
			const TYPE: TypeCode = TypeCode::$id;
            type Packed = [u8; core::mem::size_of::<$t>()];

            fn pack(&self, dst: &mut [u8]) -> PackingResult<()> {
                if dst.len() < Self::Packed::LEN
                    {return Err(PackingError::BadSize(dst.len(), "not enough bytes for number"))}
				dst[.. Self::Packed::LEN].copy_from_slice(&self.to_le_bytes());
				Ok(())
			}
			fn unpack(src: &[u8]) -> PackingResult<Self> {
				Ok(Self::from_le_bytes(src.get(.. Self::Packed::LEN)
					.and_then(|bytes| bytes.try_into().ok())
					.ok_or(PackingError::BadSize(src.len(), "not enough bytes for number"))?
					))
			}
			fn fallback() -> Self  {0 as $t}
		}};
}

num_pdodata!(u8, Unsigned8);
num_pdodata!(u16, Unsigned16);
num_pdodata!(u32, Unsigned32);
num_pdodata!(u64, Unsigned64);
num_pdodata!(i8, Integer8);
num_pdodata!(i16, Integer16);
num_pdodata!(i32, Integer32);
num_pdodata!(i64, Integer64);
num_pdodata!(f32, Real32);
num_pdodata!(f64, Real64);
