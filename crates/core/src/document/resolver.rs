//! Object resolution.
//!
//! [`PdfResolver`] turns an object number into a [`PDFObject`], either by
//! parsing the indirect object at its byte offset or by unpacking it from an
//! object stream. Results are memoized per resolver.

use crate::codec::filters::{ImageSize, apply_chain, filter_chain};
use crate::document::objstm::ObjStm;
use crate::document::params::ResolverParams;
use crate::document::xref::{XRefEntry, XRefTable};
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject, PDFStream};
use crate::parser::pdf_parser::parse_indirect_object;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Resolves object numbers of one file.
///
/// Read-only apart from the object and object-stream caches, which are filled
/// on first use and never invalidated.
pub struct PdfResolver {
    data: Bytes,
    xref: XRefTable,
    params: ResolverParams,
    cache: Mutex<HashMap<u32, Arc<PDFObject>>>,
    objstm_cache: Mutex<HashMap<u32, Arc<ObjStm>>>,
}

/// Objects currently being resolved, innermost last.
type ResolutionStack = Vec<u32>;

impl PdfResolver {
    /// Create a resolver over `data` with a pre-parsed xref table.
    pub fn new(data: impl Into<Bytes>, xref: XRefTable) -> Self {
        Self::with_params(data, xref, ResolverParams::default())
    }

    pub fn with_params(data: impl Into<Bytes>, xref: XRefTable, params: ResolverParams) -> Self {
        Self {
            data: data.into(),
            xref,
            params,
            cache: Mutex::new(HashMap::new()),
            objstm_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the xref chain of `data` and build a resolver over it.
    pub fn open(data: impl Into<Bytes>) -> Result<Self> {
        Self::open_with_params(data, ResolverParams::default())
    }

    pub fn open_with_params(data: impl Into<Bytes>, params: ResolverParams) -> Result<Self> {
        let data = data.into();
        let xref = XRefTable::load_with_limit(&data, params.max_decoded_size)?;
        Ok(Self::with_params(data, xref, params))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub const fn xref(&self) -> &XRefTable {
        &self.xref
    }

    pub const fn trailer(&self) -> &PDFDict {
        self.xref.trailer()
    }

    pub const fn params(&self) -> &ResolverParams {
        &self.params
    }

    /// Resolve object `objid`.
    pub fn get_object(&self, objid: u32) -> Result<PDFObject> {
        Ok((*self.get_object_shared(objid)?).clone())
    }

    /// Resolve object `objid` without cloning the cached value.
    pub fn get_object_shared(&self, objid: u32) -> Result<Arc<PDFObject>> {
        self.get_in(objid, &mut ResolutionStack::new())
    }

    /// Follow references until a direct value is reached.
    pub fn resolve(&self, obj: &PDFObject) -> Result<PDFObject> {
        self.resolve_in(obj, &mut ResolutionStack::new())
    }

    /// The document catalog named by the trailer's `/Root`.
    pub fn catalog(&self) -> Result<PDFObject> {
        let root = self
            .trailer()
            .get("Root")
            .ok_or_else(|| PdfError::KeyError("Root".into()))?;
        self.resolve(root)
    }

    /// Run the filter chain of `stream`, resolving indirect filter entries.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Vec<u8>> {
        self.decode_in(stream, &mut ResolutionStack::new())
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_in(&self, objid: u32, stack: &mut ResolutionStack) -> Result<Arc<PDFObject>> {
        if let Some(hit) = Self::lock(&self.cache).get(&objid) {
            return Ok(Arc::clone(hit));
        }
        if stack.contains(&objid) {
            return Err(PdfError::CircularReference(objid));
        }
        if stack.len() >= self.params.max_depth {
            return Err(PdfError::ResolutionDepthExceeded {
                objid,
                depth: self.params.max_depth,
            });
        }

        stack.push(objid);
        let loaded = self.load(objid, stack);
        stack.pop();

        let obj = Arc::new(loaded?);
        let mut cache = Self::lock(&self.cache);
        let cached = cache.entry(objid).or_insert(obj);
        tracing::debug!(objid, kind = cached.type_name(), "cached object");
        Ok(Arc::clone(cached))
    }

    fn load(&self, objid: u32, stack: &mut ResolutionStack) -> Result<PDFObject> {
        match self.xref.get(objid) {
            None => Err(PdfError::ObjectNotFound(objid)),
            Some(XRefEntry::Free) => Err(PdfError::ReferenceToFreeObject(objid)),
            Some(XRefEntry::Direct { offset, .. }) => self.load_direct(objid, offset, stack),
            Some(XRefEntry::Compressed {
                stream_objid,
                index,
            }) => self.load_compressed(objid, stream_objid, index, stack),
        }
    }

    fn load_direct(
        &self,
        objid: u32,
        offset: usize,
        stack: &mut ResolutionStack,
    ) -> Result<PDFObject> {
        let (_, obj) = parse_indirect_object(&self.data, offset, Some(objid), |length| {
            self.stream_length(objid, length, stack)
        })?;

        match obj {
            PDFObject::Stream(mut stream) if self.params.decode_streams => {
                let decoded = self.decode_in(&stream, stack)?;
                stream.set_data(decoded);
                Ok(PDFObject::Stream(stream))
            }
            other => Ok(other),
        }
    }

    /// Value of a `/Length` entry, resolving it when indirect.
    fn stream_length(
        &self,
        objid: u32,
        length: &PDFObject,
        stack: &mut ResolutionStack,
    ) -> Result<usize> {
        let PDFObject::Ref(r) = length else {
            return length.as_usize();
        };
        match self.get_in(r.objid, stack) {
            Ok(value) => value
                .as_usize()
                .map_err(|_| PdfError::UnresolvedLength(objid)),
            Err(PdfError::ObjectNotFound(_) | PdfError::ReferenceToFreeObject(_)) => {
                Err(PdfError::UnresolvedLength(objid))
            }
            Err(e) => Err(e),
        }
    }

    fn load_compressed(
        &self,
        objid: u32,
        stream_objid: u32,
        index: usize,
        stack: &mut ResolutionStack,
    ) -> Result<PDFObject> {
        let objstm = self.objstm(stream_objid, stack)?;
        if index >= objstm.len() {
            return Err(PdfError::MissingObjectInStream {
                stream: stream_objid,
                index,
                count: objstm.len(),
            });
        }
        let (found, obj) = objstm.extract(index)?;
        if found != objid {
            return Err(PdfError::SyntaxError(format!(
                "object stream {stream_objid} holds object {found} at index {index}, expected {objid}"
            )));
        }
        Ok(obj)
    }

    fn objstm(&self, stream_objid: u32, stack: &mut ResolutionStack) -> Result<Arc<ObjStm>> {
        if let Some(hit) = Self::lock(&self.objstm_cache).get(&stream_objid) {
            return Ok(Arc::clone(hit));
        }

        let container = self.get_in(stream_objid, stack)?;
        let stream = container.as_stream()?;
        if let Some(t) = stream.type_name()
            && t != "ObjStm"
        {
            return Err(PdfError::SyntaxError(format!(
                "object {stream_objid} is /{t}, not an object stream"
            )));
        }
        let header_int = |key: &str, stack: &mut ResolutionStack| -> Result<usize> {
            let value = stream
                .get(key)
                .ok_or_else(|| PdfError::ObjStmHeader(format!("missing /{key}")))?;
            self.resolve_in(value, stack)?.as_usize()
        };
        let n = header_int("N", stack)?;
        let first = header_int("First", stack)?;

        let body = if stream.is_decoded() {
            stream.get_data().to_vec()
        } else {
            self.decode_in(stream, stack)?
        };
        let objstm = Arc::new(ObjStm::new(stream_objid, body, n, first)?);
        let mut cache = Self::lock(&self.objstm_cache);
        Ok(Arc::clone(cache.entry(stream_objid).or_insert(objstm)))
    }

    fn resolve_in(&self, obj: &PDFObject, stack: &mut ResolutionStack) -> Result<PDFObject> {
        let PDFObject::Ref(r) = obj else {
            return Ok(obj.clone());
        };
        let mut current = self.get_in(r.objid, stack)?;
        // A reference that resolves to another reference; bounded by max_depth.
        for _ in 0..self.params.max_depth {
            let PDFObject::Ref(next) = current.as_ref() else {
                return Ok((*current).clone());
            };
            current = self.get_in(next.objid, stack)?;
        }
        Err(PdfError::ResolutionDepthExceeded {
            objid: r.objid,
            depth: self.params.max_depth,
        })
    }

    fn decode_in(&self, stream: &PDFStream, stack: &mut ResolutionStack) -> Result<Vec<u8>> {
        let chain = filter_chain(&stream.attrs, |o| self.resolve_in(o, stack))?;
        if chain.is_empty() {
            return Ok(stream.get_rawdata().to_vec());
        }
        let mut dims = PDFDict::new();
        for key in ["Width", "Height"] {
            if let Some(v) = stream.get(key) {
                dims.insert(key.to_string(), self.resolve_in(v, stack)?);
            }
        }
        let size = ImageSize::from_attrs(&dims)?;
        apply_chain(
            stream.get_rawdata(),
            &chain,
            size,
            self.params.max_decoded_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(entries: &[(u32, usize)]) -> XRefTable {
        XRefTable::new(
            entries
                .iter()
                .map(|&(id, offset)| (id, XRefEntry::Direct { offset, genno: 0 }))
                .collect(),
            PDFDict::new(),
        )
    }

    #[test]
    fn test_direct_object_is_memoized() {
        let data = b"1 0 obj\n<< /A 2 >>\nendobj\n".to_vec();
        let resolver = PdfResolver::new(data, direct(&[(1, 0)]));
        let a = resolver.get_object_shared(1).unwrap();
        let b = resolver.get_object_shared(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.as_dict().unwrap()["A"], PDFObject::Int(2));
    }

    #[test]
    fn test_missing_and_free_objects() {
        let mut entries = HashMap::new();
        entries.insert(3, XRefEntry::Free);
        let resolver = PdfResolver::new(Vec::new(), XRefTable::new(entries, PDFDict::new()));
        assert!(matches!(
            resolver.get_object(3),
            Err(PdfError::ReferenceToFreeObject(3))
        ));
        assert!(matches!(
            resolver.get_object(4),
            Err(PdfError::ObjectNotFound(4))
        ));
    }

    #[test]
    fn test_self_referential_length() {
        let data = b"1 0 obj\n<< /Length 1 0 R >>\nstream\nabc\nendstream\nendobj\n".to_vec();
        let resolver = PdfResolver::new(data, direct(&[(1, 0)]));
        assert!(matches!(
            resolver.get_object(1),
            Err(PdfError::CircularReference(1))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let params = ResolverParams {
            max_depth: 1,
            ..Default::default()
        };
        let data = b"1 0 obj\n<< /Length 2 0 R >>\nstream\nabc\nendstream\nendobj\n2 0 obj 3 endobj\n";
        let offset2 = data.windows(7).position(|w| w == b"2 0 obj").unwrap();
        let resolver =
            PdfResolver::with_params(data.to_vec(), direct(&[(1, 0), (2, offset2)]), params);
        assert!(matches!(
            resolver.get_object(1),
            Err(PdfError::ResolutionDepthExceeded { objid: 2, depth: 1 })
        ));
        // the length object on its own is within bounds
        assert_eq!(resolver.get_object(2).unwrap(), PDFObject::Int(3));
    }
}
