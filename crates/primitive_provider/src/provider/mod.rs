// Copyright (C) Microsoft Corporation. All rights reserved.

//! Handle-based provider API.
//!
//! [`Provider`] owns the backend dispatch table and the handle table. Every
//! entry point resolves its handles with the expected type before touching
//! any object, so a stale handle or a handle of another type fails with
//! [`CngError::InvalidHandle`] and leaves the provider unchanged.
//!
//! The provider does no internal locking; mutating calls take `&mut self`
//! and callers sharing a provider across threads serialize access.

use std::str::FromStr;

use bitflags::bitflags;

use super::*;

bitflags! {
    /// Flags accepted by [`Provider::gen_random`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RandomFlags: u32 {
        /// Use the system RNG; the algorithm handle may be null.
        const USE_SYSTEM_PREFERRED_RNG = 0x0000_0002;
    }
}

fn parse_blob_type(name: &str) -> Result<BlobType, CngError> {
    BlobType::from_str(name).map_err(|_| {
        tracing::warn!(blob = name, "unknown key blob type");
        CngError::NotImplemented
    })
}

/// Provider context.
pub struct Provider {
    config: ProviderConfig,
    dispatch: Dispatch,
    handles: HandleTable,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

impl Provider {
    /// Creates a provider and probes the configured backends once.
    #[tracing::instrument(skip_all)]
    pub fn new(config: ProviderConfig) -> Self {
        let dispatch = Dispatch::probe(&config.backends);
        tracing::debug!(backends = ?dispatch.names(), "provider created");
        Self::with_dispatch(config, dispatch)
    }

    /// Creates a provider around an existing dispatch table.
    pub fn with_dispatch(config: ProviderConfig, dispatch: Dispatch) -> Self {
        Self {
            config,
            dispatch,
            handles: HandleTable::default(),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Names of the resolved backends, in dispatch order.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.dispatch.names()
    }

    /// Number of live handles.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Opens an algorithm provider by catalog name.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - Unknown algorithm, foreign implementation
    ///   or unsupported flags.
    #[tracing::instrument(skip(self))]
    pub fn open_algorithm_provider(
        &mut self,
        name: &str,
        implementation: Option<&str>,
        flags: OpenFlags,
    ) -> Result<Handle, CngError> {
        let alg = Algorithm::open(name, implementation, flags)?;
        Ok(self.handles.alloc_handle(Object::Algorithm(alg)))
    }

    #[tracing::instrument(skip(self))]
    pub fn close_algorithm_provider(&mut self, alg: Handle) -> Result<(), CngError> {
        self.handles.free_handle(alg, HandleType::Algorithm)?;
        Ok(())
    }

    /// Lists catalog entries selected by an operation-type mask.
    pub fn enum_algorithms(&self, op_mask: u32) -> Result<Vec<AlgorithmIdentifier>, CngError> {
        enum_algorithms(op_mask)
    }

    /// Fills `buffer` with random bytes.
    ///
    /// `alg` must be an RNG algorithm handle, or [`Handle::NULL`] together
    /// with [`RandomFlags::USE_SYSTEM_PREFERRED_RNG`].
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidHandle` - `alg` is null without the system RNG
    ///   flag, or not an RNG algorithm handle.
    /// * `CngError::NotImplemented` - No backend provides random bytes.
    #[tracing::instrument(skip_all, fields(alg = %alg, len = buffer.len()))]
    pub fn gen_random(&self, alg: Handle, buffer: &mut [u8], flags: RandomFlags) -> Result<(), CngError> {
        if alg.is_null() {
            if !flags.contains(RandomFlags::USE_SYSTEM_PREFERRED_RNG) {
                return Err(CngError::InvalidHandle);
            }
        } else if self.handles.algorithm(alg)?.id() != AlgId::Rng {
            tracing::warn!("random bytes from a non-rng algorithm");
            return Err(CngError::InvalidHandle);
        }

        if buffer.is_empty() {
            return Ok(());
        }
        self.dispatch.gen_random(buffer)
    }

    pub fn get_fips_algorithm_mode(&self) -> bool {
        self.config.fips_mode
    }

    /// Reads a named property of an algorithm, hash or key handle.
    ///
    /// With `output == None` the required size is returned.
    #[tracing::instrument(skip(self, output))]
    pub fn get_property(&self, handle: Handle, name: &str, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        match self.handles.get_handle_type(handle)? {
            HandleType::Algorithm => self.handles.algorithm(handle)?.property(name, output),
            HandleType::Hash => self.handles.hash(handle)?.property(name, output),
            HandleType::Key => self.handles.key(handle)?.property(name, output),
            HandleType::Secret => Err(CngError::InvalidHandle),
        }
    }

    /// Writes a named property of an algorithm or key handle.
    #[tracing::instrument(skip(self, value))]
    pub fn set_property(&mut self, handle: Handle, name: &str, value: &[u8]) -> Result<(), CngError> {
        match self.handles.get_handle_type(handle)? {
            HandleType::Algorithm => self.handles.algorithm_mut(handle)?.set_property(name, value),
            HandleType::Key => self.handles.key_mut(handle)?.set_property(name, value),
            HandleType::Hash | HandleType::Secret => Err(CngError::InvalidHandle),
        }
    }

    /// Creates a hash object.
    ///
    /// The hash is an HMAC when `alg` was opened with [`OpenFlags::HMAC`],
    /// and reusable when either `alg` or `flags` carries
    /// [`OpenFlags::HASH_REUSABLE`].
    ///
    /// # Errors
    ///
    /// * `CngError::NotImplemented` - `flags` carries anything other than
    ///   [`OpenFlags::HASH_REUSABLE`].
    /// * `CngError::InvalidHandle` - `alg` is not a hash algorithm handle.
    #[tracing::instrument(skip_all, fields(alg = %alg))]
    pub fn create_hash(&mut self, alg: Handle, secret: &[u8], flags: OpenFlags) -> Result<Handle, CngError> {
        if !OpenFlags::HASH_REUSABLE.contains(flags) {
            tracing::warn!(?flags, "unsupported hash flags");
            return Err(CngError::NotImplemented);
        }

        let algorithm = self.handles.algorithm(alg)?;
        let hmac = algorithm.flags().contains(OpenFlags::HMAC);
        let reusable = algorithm.flags().union(flags).contains(OpenFlags::HASH_REUSABLE);
        let hash = Hash::new(algorithm.id(), hmac, reusable, secret)?;
        Ok(self.handles.alloc_handle(Object::Hash(Box::new(hash))))
    }

    /// Deep-copies a hash, including its running state.
    #[tracing::instrument(skip(self))]
    pub fn duplicate_hash(&mut self, hash: Handle) -> Result<Handle, CngError> {
        let copy = self.handles.hash(hash)?.clone();
        Ok(self.handles.alloc_handle(Object::Hash(Box::new(copy))))
    }

    #[tracing::instrument(skip(self))]
    pub fn destroy_hash(&mut self, hash: Handle) -> Result<(), CngError> {
        self.handles.free_handle(hash, HandleType::Hash)?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(hash = %hash, len = input.len()))]
    pub fn hash_data(&mut self, hash: Handle, input: &[u8]) -> Result<(), CngError> {
        self.handles.hash_mut(hash)?.update(input)
    }

    /// Writes the digest; `output` must be exactly the digest length.
    #[tracing::instrument(skip_all, fields(hash = %hash))]
    pub fn finish_hash(&mut self, hash: Handle, output: &mut [u8]) -> Result<(), CngError> {
        self.handles.hash_mut(hash)?.finish(output)
    }

    /// One-shot digest, or HMAC when `alg` was opened with
    /// [`OpenFlags::HMAC`].
    #[tracing::instrument(skip_all, fields(alg = %alg))]
    pub fn hash(&self, alg: Handle, secret: &[u8], input: &[u8], output: &mut [u8]) -> Result<(), CngError> {
        let algorithm = self.handles.algorithm(alg)?;
        let hmac = algorithm.flags().contains(OpenFlags::HMAC);
        hash_once(algorithm.id(), hmac, secret, input, output)
    }

    /// Creates a symmetric key from raw secret bytes; the key inherits the
    /// algorithm's chaining mode.
    #[tracing::instrument(skip_all, fields(alg = %alg))]
    pub fn generate_symmetric_key(&mut self, alg: Handle, secret: &[u8]) -> Result<Handle, CngError> {
        let key = SymmetricKey::new(self.handles.algorithm(alg)?, secret)?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(Key::Symmetric(key)))))
    }

    /// Allocates an empty key pair; [`Provider::finalize_key_pair`]
    /// generates it.
    #[tracing::instrument(skip(self))]
    pub fn generate_key_pair(&mut self, alg: Handle, bits: u32) -> Result<Handle, CngError> {
        let key = AsymmetricKey::new(self.handles.algorithm(alg)?, bits)?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(Key::Asymmetric(key)))))
    }

    #[tracing::instrument(skip(self))]
    pub fn finalize_key_pair(&mut self, key: Handle) -> Result<(), CngError> {
        match self.handles.key_mut(key)? {
            Key::Asymmetric(pair) => pair.finalize(&self.dispatch),
            Key::Symmetric(_) => Err(CngError::NotSupported),
        }
    }

    /// Imports a symmetric key from a `KeyDataBlob` or `OpaqueKeyBlob`.
    ///
    /// # Errors
    ///
    /// * `CngError::NotImplemented` - Unknown or asymmetric blob type.
    #[tracing::instrument(skip(self, input))]
    pub fn import_key(&mut self, alg: Handle, blob_type: &str, input: &[u8]) -> Result<Handle, CngError> {
        let blob_type = parse_blob_type(blob_type)?;
        let key = SymmetricKey::import(self.handles.algorithm(alg)?, blob_type, input)?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(Key::Symmetric(key)))))
    }

    /// Imports a public key or key pair from an asymmetric blob.
    #[tracing::instrument(skip(self, input))]
    pub fn import_key_pair(&mut self, alg: Handle, blob_type: &str, input: &[u8]) -> Result<Handle, CngError> {
        let blob_type = parse_blob_type(blob_type)?;
        let key = AsymmetricKey::import(self.handles.algorithm(alg)?, blob_type, input, &self.dispatch)?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(Key::Asymmetric(key)))))
    }

    /// Exports a key as a typed blob.
    ///
    /// With `output == None` the exact blob size is returned.
    #[tracing::instrument(skip(self, output))]
    pub fn export_key(&self, key: Handle, blob_type: &str, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        let blob_type = parse_blob_type(blob_type)?;
        match self.handles.key(key)? {
            Key::Symmetric(key) => key.export(blob_type, output),
            Key::Asymmetric(key) => key.export(blob_type, &self.dispatch, output),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn duplicate_key(&mut self, key: Handle) -> Result<Handle, CngError> {
        let copy = self.handles.key(key)?.duplicate()?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(copy))))
    }

    #[tracing::instrument(skip(self))]
    pub fn destroy_key(&mut self, key: Handle) -> Result<(), CngError> {
        self.handles.free_handle(key, HandleType::Key)?;
        Ok(())
    }

    /// Encrypts with a symmetric key.
    ///
    /// With `output == None` the exact ciphertext length is returned.
    #[tracing::instrument(skip_all, fields(key = %key, len = input.len(), flags = ?flags))]
    pub fn encrypt(
        &mut self,
        key: Handle,
        input: &[u8],
        auth: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: EncryptFlags,
    ) -> Result<usize, CngError> {
        let key = self.handles.key_mut(key)?;
        if !EncryptFlags::all().contains(flags) {
            tracing::warn!(flags = flags.bits(), "unsupported cipher flags");
            return Err(CngError::NotImplemented);
        }

        match key {
            Key::Symmetric(key) => key.encrypt(&self.dispatch, input, auth, iv, output, flags),
            Key::Asymmetric(_) => {
                tracing::warn!("encryption with a key pair");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Decrypts with a symmetric key.
    ///
    /// With `output == None` an upper bound of the plaintext length is
    /// returned.
    #[tracing::instrument(skip_all, fields(key = %key, len = input.len(), flags = ?flags))]
    pub fn decrypt(
        &mut self,
        key: Handle,
        input: &[u8],
        auth: Option<&AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: EncryptFlags,
    ) -> Result<usize, CngError> {
        let key = self.handles.key_mut(key)?;
        if !EncryptFlags::all().contains(flags) {
            tracing::warn!(flags = flags.bits(), "unsupported cipher flags");
            return Err(CngError::NotImplemented);
        }

        match key {
            Key::Symmetric(key) => key.decrypt(&self.dispatch, input, auth, iv, output, flags),
            Key::Asymmetric(_) => {
                tracing::warn!("decryption with a key pair");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Signs a precomputed digest.
    ///
    /// With `output == None` the exact signature length is returned.
    #[tracing::instrument(skip_all, fields(key = %key, len = hash.len(), flags = ?flags))]
    pub fn sign_hash(
        &self,
        key: Handle,
        padding: Option<&Pkcs1PaddingInfo<'_>>,
        hash: &[u8],
        output: Option<&mut [u8]>,
        flags: SignFlags,
    ) -> Result<usize, CngError> {
        match self.handles.key(key)? {
            Key::Asymmetric(key) => key.sign(&self.dispatch, padding, hash, output, flags),
            Key::Symmetric(_) => {
                tracing::warn!("signing with a symmetric key");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Verifies a signature over a precomputed digest.
    #[tracing::instrument(skip_all, fields(key = %key, flags = ?flags))]
    pub fn verify_signature(
        &self,
        key: Handle,
        padding: Option<&Pkcs1PaddingInfo<'_>>,
        hash: &[u8],
        signature: &[u8],
        flags: SignFlags,
    ) -> Result<(), CngError> {
        let key = self.handles.key(key)?;
        if hash.is_empty() || signature.is_empty() {
            return Err(CngError::InvalidParameter);
        }

        match key {
            Key::Asymmetric(key) => key.verify(&self.dispatch, padding, hash, signature, flags),
            Key::Symmetric(_) => Err(CngError::NotSupported),
        }
    }

    /// Finishes `hash` and expands its digest into `output`.
    ///
    /// # Errors
    ///
    /// * `CngError::NotImplemented` - A target algorithm handle was given.
    /// * `CngError::InvalidParameter` - Empty output or more than twice the
    ///   digest length.
    #[tracing::instrument(skip_all, fields(hash = %hash, alg = %alg, len = output.len()))]
    pub fn derive_key_capi(&mut self, hash: Handle, alg: Handle, output: &mut [u8]) -> Result<(), CngError> {
        let hash = self.handles.hash_mut(hash)?;
        if !alg.is_null() {
            tracing::warn!("capi derivation for a target algorithm");
            return Err(CngError::NotImplemented);
        }
        derive_key_capi(hash, output)
    }

    /// Derives `output.len()` bytes with PBKDF2 over the algorithm's hash.
    #[tracing::instrument(skip_all, fields(alg = %alg, iterations = iterations, len = output.len()))]
    pub fn derive_key_pbkdf2(
        &self,
        alg: Handle,
        password: &[u8],
        salt: &[u8],
        iterations: u64,
        output: &mut [u8],
    ) -> Result<(), CngError> {
        pbkdf2(self.handles.algorithm(alg)?, password, salt, iterations, output)
    }

    /// Computes the secret shared by a private key and a peer public key.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidHandle` - Either handle is not a key handle.
    /// * `CngError::NotSupported` - Either key is symmetric or not an ECDH
    ///   key.
    /// * `CngError::InvalidParameter` - Mismatched or incomplete keys.
    #[tracing::instrument(skip(self))]
    pub fn secret_agreement(&mut self, private: Handle, public: Handle) -> Result<Handle, CngError> {
        let own = self.handles.key(private)?;
        let peer = self.handles.key(public)?;
        let (Key::Asymmetric(own), Key::Asymmetric(peer)) = (own, peer) else {
            tracing::warn!("secret agreement with a symmetric key");
            return Err(CngError::NotSupported);
        };

        let secret = Secret::agree(own, peer, &self.dispatch)?;
        Ok(self.handles.alloc_handle(Object::Secret(secret)))
    }

    #[tracing::instrument(skip(self))]
    pub fn destroy_secret(&mut self, secret: Handle) -> Result<(), CngError> {
        self.handles.free_handle(secret, HandleType::Secret)?;
        Ok(())
    }

    /// Derives key material from an agreed secret with a named KDF.
    ///
    /// With `output == None` the full output length is returned; a short
    /// buffer truncates the result.
    #[tracing::instrument(skip(self, params, output))]
    pub fn derive_key(
        &self,
        secret: Handle,
        kdf: &str,
        params: &[KdfParameter<'_>],
        output: Option<&mut [u8]>,
    ) -> Result<usize, CngError> {
        derive_key(self.handles.secret(secret)?, kdf, params, output)
    }
}

#[cfg(test)]
mod tests;
